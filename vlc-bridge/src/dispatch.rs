//! The dispatch trampoline
//!
//! [`event_dispatch`] is the only function ever registered with the native
//! attach call. The user data pointer it receives is an [`EventId`], never an
//! address, so a late event for a detached token finds nothing and returns.
//! Callbacks run synchronously on the calling native thread, outside every
//! registry lock, and a panic never crosses back into native frames.

use std::any::Any;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use vlc_registry::EventId;
use vlc_sys as sys;

use crate::event;
use crate::event_kind::EventKind;
use crate::instance::{self, Instance};

/// Trampoline handed to libvlc for every attachment
///
/// # Safety
///
/// Called by native code with either a null pointer or a pointer to a live
/// `libvlc_event_t`, and the token registered at attach time.
pub unsafe extern "C" fn event_dispatch(event: *const sys::libvlc_event_t, user_data: *mut c_void) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let Some(instance) = instance::current_instance() else {
            tracing::trace!("Event arrived with no live instance, ignoring");
            return;
        };
        instance.dispatch(event, user_data);
    }));

    if let Err(payload) = outcome {
        tracing::error!("Event dispatch panicked: {}", panic_message(&payload));
    }
}

impl Instance {
    /// Deliver a native event to the callback registered under `user_data`
    ///
    /// Returns whether a callback ran to completion. Unknown tokens,
    /// released instances, null events and events whose type differs from
    /// the registered kind are skipped.
    ///
    /// # Safety
    ///
    /// `event` must be null or point to a valid `libvlc_event_t` whose
    /// payload matches its type.
    pub unsafe fn dispatch(&self, event: *const sys::libvlc_event_t, user_data: *mut c_void) -> bool {
        if self.is_released() {
            return false;
        }

        let id = EventId::from_user_data(user_data);
        let Some(context) = self.events().get(id) else {
            tracing::trace!("No registration for {}, event skipped", id);
            return false;
        };

        let Some(raw) = event.as_ref() else {
            tracing::warn!("Null event pointer delivered for {}", id);
            return false;
        };

        if raw.type_ != context.kind.code() {
            tracing::warn!(
                "Event type {:#x} ({:?}) delivered to {} registered for {:?}",
                raw.type_,
                EventKind::from_code(raw.type_),
                id,
                context.kind
            );
            return false;
        }

        self.enter_native_thread();

        let decoded = event::decode(context.kind, raw);
        if self.config().verbose_dispatch {
            tracing::debug!("Dispatching {:?} to {}", decoded, id);
        } else {
            tracing::trace!("Dispatching {:?} to {}", context.kind, id);
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (context.callback)(&decoded, &context.user_data)
        }));
        let elapsed = started.elapsed();

        if let Some(threshold) = self.config().slow_callback_threshold() {
            if elapsed > threshold {
                tracing::warn!(
                    "Callback for {} ({:?}) blocked the native thread for {:?}",
                    id,
                    context.kind,
                    elapsed
                );
            }
        }

        match outcome {
            Ok(()) => true,
            Err(payload) => {
                tracing::error!(
                    "Callback for {} ({:?}) panicked: {}",
                    id,
                    context.kind,
                    panic_message(&payload)
                );
                false
            }
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

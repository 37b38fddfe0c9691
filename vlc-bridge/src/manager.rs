//! Attach/detach facade for one native event manager
//!
//! Registry state and native state change together: a token present in the
//! registry is attached natively. Attach inserts first and rolls back when
//! the native call fails; detach removes first, so a concurrent dispatch for
//! the token already finds nothing while the native detach runs.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use crossbeam::channel;
use vlc_registry::EventId;

use crate::dispatch::event_dispatch;
use crate::error::{BridgeError, Result};
use crate::event::Event;
use crate::event_kind::EventKind;
use crate::instance::Instance;
use crate::iter::EventSubscription;
use crate::native::ManagerHandle;

/// Opaque value handed back to a callback on every invocation
pub type UserData = Option<Arc<dyn Any + Send + Sync>>;

/// A registered event callback
pub type EventCallback = Arc<dyn Fn(&Event, &UserData) + Send + Sync>;

/// What to run when a token's event fires
#[derive(Clone)]
pub struct EventContext {
    pub manager: ManagerHandle,
    pub kind: EventKind,
    pub callback: EventCallback,
    pub user_data: UserData,
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventContext")
            .field("manager", &self.manager)
            .field("kind", &self.kind)
            .field("user_data", &self.user_data.is_some())
            .finish()
    }
}

/// Event manager of a native object (player, media, list, discoverer)
#[derive(Clone)]
pub struct EventManager {
    instance: Weak<Instance>,
    handle: ManagerHandle,
}

impl EventManager {
    pub(crate) fn new(instance: Weak<Instance>, handle: ManagerHandle) -> Self {
        Self { instance, handle }
    }

    /// The native handle this manager attaches to
    pub fn handle(&self) -> ManagerHandle {
        self.handle
    }

    /// The owning instance, unless it was released
    pub fn instance(&self) -> Result<Arc<Instance>> {
        self.instance
            .upgrade()
            .filter(|instance| !instance.is_released())
            .ok_or(BridgeError::NotInitialized)
    }

    /// Register `callback` for `kind`
    ///
    /// The returned id is the only way to detach. The callback runs on
    /// whichever native thread emits the event, so it must be quick; use
    /// [`subscribe`](Self::subscribe) to hand events to another thread.
    pub fn attach<F>(&self, kind: EventKind, callback: F, user_data: UserData) -> Result<EventId>
    where
        F: Fn(&Event, &UserData) + Send + Sync + 'static,
    {
        self.attach_boxed(kind, Some(Arc::new(callback)), user_data)
    }

    /// Register an optional callback, rejecting `None`
    pub fn attach_boxed(
        &self,
        kind: EventKind,
        callback: Option<EventCallback>,
        user_data: UserData,
    ) -> Result<EventId> {
        let callback = callback.ok_or(BridgeError::InvalidCallback)?;
        let instance = self.instance()?;

        let id = instance.events().add(EventContext {
            manager: self.handle,
            kind,
            callback,
            user_data,
        });

        let Some(token) = id.to_token() else {
            instance.events().remove(id);
            return Err(BridgeError::TokenOverflow(id));
        };

        let status = instance
            .backend()
            .attach(self.handle, kind.code(), event_dispatch, token);
        if status != 0 {
            instance.events().remove(id);
            let message = instance
                .backend()
                .take_last_error()
                .unwrap_or_else(|| format!("native attach returned {}", status));
            tracing::warn!("Attach of {:?} on {} rolled back: {}", kind, self.handle, message);
            return Err(BridgeError::AttachFailed { kind, message });
        }

        tracing::debug!("Attached {} for {:?} on {}", id, kind, self.handle);
        Ok(id)
    }

    /// Detach every id in `ids`
    ///
    /// Unknown ids, ids already detached and ids attached through another
    /// manager are skipped.
    pub fn detach<I>(&self, ids: I) -> Result<()>
    where
        I: IntoIterator<Item = EventId>,
    {
        let instance = self.instance()?;

        for id in ids {
            let Some(context) = instance
                .events()
                .remove_if(id, |context| context.manager == self.handle)
            else {
                tracing::trace!("Detach of {} on {} skipped", id, self.handle);
                continue;
            };

            // Tokens in the registry always fit, attach checked them.
            if let Some(token) = id.to_token() {
                instance
                    .backend()
                    .detach(self.handle, context.kind.code(), event_dispatch, token);
            }
            tracing::debug!("Detached {} for {:?} on {}", id, context.kind, self.handle);
        }

        Ok(())
    }

    /// Ids currently attached through this manager
    pub fn registrations(&self) -> Vec<EventId> {
        let Ok(instance) = self.instance() else {
            return Vec::new();
        };
        instance
            .events()
            .ids()
            .into_iter()
            .filter(|id| {
                instance
                    .events()
                    .get(*id)
                    .map_or(false, |context| context.manager == self.handle)
            })
            .collect()
    }

    /// Detach everything attached through this manager
    pub fn detach_all(&self) -> Result<()> {
        let ids = self.registrations();
        self.detach(ids)
    }

    /// Forward events of `kind` to a channel
    ///
    /// The subscription detaches itself when dropped.
    pub fn subscribe(&self, kind: EventKind) -> Result<EventSubscription> {
        let (tx, rx) = channel::unbounded();
        let id = self.attach(
            kind,
            move |event, _| {
                // The receiver may be gone while the detach is in flight.
                let _ = tx.send(event.clone());
            },
            None,
        )?;
        Ok(EventSubscription::new(self.clone(), id, rx))
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("handle", &self.handle)
            .field("alive", &self.instance().is_ok())
            .finish()
    }
}

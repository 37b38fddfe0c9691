//! Backend bound to the system libvlc

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicPtr, Ordering};

use vlc_sys as sys;

use super::{ManagerHandle, MediaCallbacks, NativeBackend, TrampolineFn};
use crate::config::InstanceConfig;
use crate::error::{BridgeError, Result};
use crate::event::NativeRef;

/// A libvlc instance created with `libvlc_new`
pub struct LibVlcBackend {
    handle: AtomicPtr<sys::libvlc_instance_t>,
}

impl LibVlcBackend {
    /// Create the native instance from `config`
    pub fn new(config: &InstanceConfig) -> Result<Self> {
        let args = config
            .args
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| BridgeError::InstanceCreation(e.to_string()))?;
        let argv: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();

        // SAFETY: argv points at `args.len()` NUL-terminated strings that
        // outlive the call.
        let handle = unsafe { sys::libvlc_new(argv.len() as c_int, argv.as_ptr()) };
        if handle.is_null() {
            let message = last_error().unwrap_or_else(|| "libvlc_new returned NULL".to_string());
            return Err(BridgeError::InstanceCreation(message));
        }

        if let Some(app) = &config.app_name {
            let name = CString::new(app.name.as_str());
            let agent = CString::new(app.user_agent.as_str());
            match (name, agent) {
                (Ok(name), Ok(agent)) => unsafe {
                    sys::libvlc_set_user_agent(handle, name.as_ptr(), agent.as_ptr());
                },
                _ => tracing::warn!("Ignoring application name containing NUL bytes"),
            }
        }

        tracing::info!("Created libvlc instance with {} arguments", args.len());
        Ok(Self {
            handle: AtomicPtr::new(handle),
        })
    }

    /// The raw instance pointer, null after shutdown
    pub fn raw(&self) -> *mut sys::libvlc_instance_t {
        self.handle.load(Ordering::Acquire)
    }
}

impl NativeBackend for LibVlcBackend {
    fn attach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize) -> i32 {
        // SAFETY: the manager handle came from a live libvlc object.
        unsafe {
            sys::libvlc_event_attach(manager.as_ptr(), code, Some(callback), token as *mut c_void)
        }
    }

    fn detach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize) {
        unsafe {
            sys::libvlc_event_detach(manager.as_ptr(), code, Some(callback), token as *mut c_void)
        }
    }

    fn take_last_error(&self) -> Option<String> {
        last_error()
    }

    fn hold_renderer_item(&self, item: NativeRef) {
        if !item.is_null() {
            unsafe { sys::libvlc_renderer_item_hold(item.as_ptr()) };
        }
    }

    fn release_renderer_item(&self, item: NativeRef) {
        if !item.is_null() {
            unsafe { sys::libvlc_renderer_item_release(item.as_ptr()) };
        }
    }

    fn new_callback_media(&self, callbacks: MediaCallbacks, opaque: usize) -> Option<NativeRef> {
        let instance = self.raw();
        if instance.is_null() {
            return None;
        }
        let media = unsafe {
            sys::libvlc_media_new_callbacks(
                instance,
                callbacks.open,
                callbacks.read,
                callbacks.seek,
                callbacks.close,
                opaque as *mut c_void,
            )
        };
        (!media.is_null()).then(|| NativeRef::from_ptr(media))
    }

    fn release_media(&self, media: NativeRef) {
        if !media.is_null() {
            unsafe { sys::libvlc_media_release(media.as_ptr()) };
        }
    }

    fn shutdown(&self) {
        let handle = self.handle.swap(std::ptr::null_mut(), Ordering::AcqRel);
        if !handle.is_null() {
            unsafe { sys::libvlc_release(handle) };
            tracing::info!("Released libvlc instance");
        }
    }
}

impl Drop for LibVlcBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read and clear libvlc's thread-global error message
fn last_error() -> Option<String> {
    // SAFETY: libvlc_errmsg returns NULL or a string valid until the next
    // libvlc call on this thread; it is copied before clearing.
    unsafe {
        let message = sys::libvlc_errmsg();
        if message.is_null() {
            return None;
        }
        let owned = CStr::from_ptr(message).to_string_lossy().into_owned();
        sys::libvlc_clearerr();
        Some(owned)
    }
}

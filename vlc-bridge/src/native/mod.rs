//! The seam between the bridge and the native library
//!
//! Everything the bridge needs from libvlc goes through [`NativeBackend`].
//! [`LoopbackBackend`] is an in-process stand-in that fires events through
//! the same `extern "C"` trampoline libvlc would call; `LibVlcBackend` binds
//! the real library when the `libvlc` feature is enabled.

use std::os::raw::c_void;

use vlc_sys as sys;

use crate::event::NativeRef;

#[cfg(feature = "libvlc")]
mod libvlc;
mod loopback;

#[cfg(feature = "libvlc")]
pub use libvlc::LibVlcBackend;
pub use loopback::LoopbackBackend;

/// Signature of the function registered with the native attach call
pub type TrampolineFn = unsafe extern "C" fn(*const sys::libvlc_event_t, *mut c_void);

/// Address of a native `libvlc_event_manager_t`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerHandle(usize);

impl ManagerHandle {
    /// Wrap a native event manager pointer; `None` when null
    pub fn from_ptr(ptr: *mut sys::libvlc_event_manager_t) -> Option<Self> {
        (!ptr.is_null()).then_some(Self(ptr as usize))
    }

    /// Wrap a raw address, used by in-process backends that invent handles
    pub const fn from_raw(addr: usize) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> usize {
        self.0
    }

    pub fn as_ptr(&self) -> *mut sys::libvlc_event_manager_t {
        self.0 as *mut sys::libvlc_event_manager_t
    }
}

impl std::fmt::Display for ManagerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "em@{:#x}", self.0)
    }
}

/// The four callbacks backing a reader media
#[derive(Debug, Clone, Copy)]
pub struct MediaCallbacks {
    pub open: sys::libvlc_media_open_cb,
    pub read: sys::libvlc_media_read_cb,
    pub seek: sys::libvlc_media_seek_cb,
    pub close: sys::libvlc_media_close_cb,
}

/// Native operations used by the bridge
///
/// Implementations must be callable from any thread. `attach` follows the
/// libvlc convention of returning 0 on success; on failure the
/// implementation leaves a message for [`take_last_error`](Self::take_last_error).
#[cfg_attr(test, mockall::automock)]
pub trait NativeBackend: Send + Sync {
    /// Register `callback` for `code` on `manager` with `token` as user data
    fn attach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize)
        -> i32;

    /// Unregister a previous attach with the same arguments
    fn detach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize);

    /// Read and clear the process-wide error message
    fn take_last_error(&self) -> Option<String>;

    /// Retain a renderer item beyond the event that announced it
    fn hold_renderer_item(&self, _item: NativeRef) {}

    /// Drop a reference taken by [`hold_renderer_item`](Self::hold_renderer_item)
    fn release_renderer_item(&self, _item: NativeRef) {}

    /// Create a media object reading through `callbacks`, passing `opaque`
    /// back to each of them. `None` when unsupported or on failure.
    fn new_callback_media(&self, _callbacks: MediaCallbacks, _opaque: usize) -> Option<NativeRef> {
        None
    }

    /// Release a media object created by [`new_callback_media`](Self::new_callback_media)
    fn release_media(&self, _media: NativeRef) {}

    /// Release the native instance. Called once.
    fn shutdown(&self) {}
}

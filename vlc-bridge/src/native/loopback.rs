//! In-process native backend
//!
//! Keeps attachments in a concurrent map and fires events through the
//! registered `extern "C"` callbacks exactly as libvlc does, either on the
//! calling thread or on a dedicated "native" worker thread. Used by the
//! test suites and by embedders that want the bridge without a system libvlc.

use std::os::raw::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use vlc_sys as sys;

use super::{ManagerHandle, MediaCallbacks, NativeBackend, TrampolineFn};
use crate::event::NativeRef;

type Attachment = (TrampolineFn, usize);
type AttachmentMap = DashMap<(ManagerHandle, i32), Vec<Attachment>>;

/// A native event queued for the worker thread
struct QueuedEvent(sys::libvlc_event_t);

// The payload may carry raw pointers. Callers of `emit_on_worker` keep them
// valid until the worker has fired the event.
unsafe impl Send for QueuedEvent {}

/// Commands processed by the native worker thread
enum Command {
    Emit {
        manager: ManagerHandle,
        event: QueuedEvent,
    },
    Flush(Sender<()>),
    Shutdown,
}

struct Worker {
    tx: Sender<Command>,
    handle: JoinHandle<()>,
}

/// Fake native library living in the current process
pub struct LoopbackBackend {
    attachments: Arc<AttachmentMap>,
    pending_failures: DashMap<ManagerHandle, String>,
    last_error: Mutex<Option<String>>,
    held_renderers: DashMap<NativeRef, u32>,
    media: DashMap<NativeRef, (MediaCallbacks, usize)>,
    next_handle: AtomicUsize,
    worker: Mutex<Option<Worker>>,
}

impl LoopbackBackend {
    pub fn new() -> Self {
        Self {
            attachments: Arc::new(DashMap::new()),
            pending_failures: DashMap::new(),
            last_error: Mutex::new(None),
            held_renderers: DashMap::new(),
            media: DashMap::new(),
            next_handle: AtomicUsize::new(0x1000),
            worker: Mutex::new(None),
        }
    }

    /// Invent a fresh event manager handle
    pub fn new_manager(&self) -> ManagerHandle {
        ManagerHandle::from_raw(self.next_handle.fetch_add(0x10, Ordering::Relaxed))
    }

    /// Make the next attach on `manager` fail with `message`
    pub fn fail_next_attach(&self, manager: ManagerHandle, message: impl Into<String>) {
        self.pending_failures.insert(manager, message.into());
    }

    /// Set the process-wide error message, as a failing native call would
    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    /// Total number of live native attachments
    pub fn attachment_count(&self) -> usize {
        self.attachments.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of live attachments on one manager
    pub fn attachments_on(&self, manager: ManagerHandle) -> usize {
        self.attachments
            .iter()
            .filter(|entry| entry.key().0 == manager)
            .map(|entry| entry.value().len())
            .sum()
    }

    /// Fire `event` on the calling thread
    ///
    /// Returns how many callbacks were invoked. The attachment list is
    /// snapshotted first, so callbacks may attach or detach freely.
    ///
    /// # Safety
    ///
    /// Pointers inside the event payload must be valid for the call.
    pub unsafe fn emit(&self, manager: ManagerHandle, event: &sys::libvlc_event_t) -> usize {
        fire(&self.attachments, manager, event)
    }

    /// Fire an event of `code` with an empty payload on the calling thread
    pub fn emit_empty(&self, manager: ManagerHandle, code: i32) -> usize {
        let event = sys::libvlc_event_t::empty(code);
        // SAFETY: the empty payload holds only null pointers.
        unsafe { self.emit(manager, &event) }
    }

    /// Queue `event` for the native worker thread
    ///
    /// # Safety
    ///
    /// Pointers inside the event payload must stay valid until the worker
    /// has fired it (see [`flush`](Self::flush)).
    pub unsafe fn emit_on_worker(&self, manager: ManagerHandle, event: sys::libvlc_event_t) {
        let mut guard = self.worker.lock();
        if guard.is_none() {
            match spawn_native_worker(Arc::clone(&self.attachments)) {
                Ok(worker) => *guard = Some(worker),
                Err(e) => {
                    tracing::error!("Failed to spawn loopback worker: {}", e);
                    return;
                }
            }
        }
        let sent = guard.as_ref().map(|worker| {
            worker
                .tx
                .send(Command::Emit {
                    manager,
                    event: QueuedEvent(event),
                })
                .is_ok()
        });
        if sent != Some(true) {
            tracing::warn!("Loopback worker is gone, dropping event {:#x}", event.type_);
        }
    }

    /// Block until the worker has fired everything queued so far
    pub fn flush(&self) {
        let (done_tx, done_rx) = channel::bounded(1);
        let sent = match self.worker.lock().as_ref() {
            Some(worker) => worker.tx.send(Command::Flush(done_tx)).is_ok(),
            None => false,
        };
        if sent {
            let _ = done_rx.recv();
        }
    }

    /// Whether `item` is currently retained
    pub fn is_renderer_held(&self, item: NativeRef) -> bool {
        self.held_renderers.contains_key(&item)
    }

    /// Number of distinct renderer items retained
    pub fn held_renderer_count(&self) -> usize {
        self.held_renderers.len()
    }

    /// Number of media objects created through `new_callback_media` and not released
    pub fn live_media_count(&self) -> usize {
        self.media.len()
    }

    /// Demux a callback media the way the native input thread would
    ///
    /// Calls open, seeks to `offset` when non-zero, reads until end of
    /// stream and closes. `None` when the media is unknown or any callback
    /// reports failure.
    pub fn read_media(&self, media: NativeRef, offset: u64) -> Option<Vec<u8>> {
        let (callbacks, opaque) = *self.media.get(&media)?;
        let (open, read, seek, close) =
            (callbacks.open?, callbacks.read?, callbacks.seek?, callbacks.close?);

        let mut data: *mut c_void = std::ptr::null_mut();
        let mut size: u64 = 0;
        // SAFETY: the callbacks were handed over by the bridge together with
        // the opaque value they expect.
        unsafe {
            if open(opaque as *mut c_void, &mut data, &mut size) != 0 {
                return None;
            }
            if offset > 0 && seek(data, offset) != 0 {
                close(data);
                return None;
            }

            let mut out = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = read(data, buf.as_mut_ptr(), buf.len());
                if n < 0 {
                    close(data);
                    return None;
                }
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n as usize]);
            }
            close(data);

            if size != u64::MAX && offset == 0 && out.len() as u64 != size {
                tracing::warn!("Media {} reported {} bytes but produced {}", media, size, out.len());
            }
            Some(out)
        }
    }

    fn stop_worker(&self) {
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.tx.send(Command::Shutdown);
            if worker.handle.join().is_err() {
                tracing::error!("Loopback worker panicked");
            }
        }
    }
}

impl Default for LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoopbackBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackBackend")
            .field("attachments", &self.attachment_count())
            .field("held_renderers", &self.held_renderers.len())
            .field("media", &self.media.len())
            .finish()
    }
}

impl NativeBackend for LoopbackBackend {
    fn attach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize) -> i32 {
        if let Some((_, message)) = self.pending_failures.remove(&manager) {
            *self.last_error.lock() = Some(message);
            return -1;
        }

        self.attachments
            .entry((manager, code))
            .or_default()
            .push((callback, token));
        0
    }

    fn detach(&self, manager: ManagerHandle, code: i32, callback: TrampolineFn, token: usize) {
        let key = (manager, code);
        if let Some(mut entry) = self.attachments.get_mut(&key) {
            let list = entry.value_mut();
            if let Some(pos) = list
                .iter()
                .position(|(cb, tok)| *cb as usize == callback as usize && *tok == token)
            {
                list.remove(pos);
            }
        }
        self.attachments.remove_if(&key, |_, list| list.is_empty());
    }

    fn take_last_error(&self) -> Option<String> {
        self.last_error.lock().take()
    }

    fn hold_renderer_item(&self, item: NativeRef) {
        *self.held_renderers.entry(item).or_insert(0) += 1;
    }

    fn release_renderer_item(&self, item: NativeRef) {
        if let Some(mut count) = self.held_renderers.get_mut(&item) {
            *count = count.saturating_sub(1);
        }
        self.held_renderers.remove_if(&item, |_, count| *count == 0);
    }

    fn new_callback_media(&self, callbacks: MediaCallbacks, opaque: usize) -> Option<NativeRef> {
        let media = NativeRef::from_addr(self.next_handle.fetch_add(0x10, Ordering::Relaxed));
        self.media.insert(media, (callbacks, opaque));
        Some(media)
    }

    fn release_media(&self, media: NativeRef) {
        self.media.remove(&media);
    }

    fn shutdown(&self) {
        self.stop_worker();
        let left = self.attachment_count();
        if left > 0 {
            tracing::debug!("Loopback shut down with {} attachments", left);
        }
    }
}

impl Drop for LoopbackBackend {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

unsafe fn fire(attachments: &AttachmentMap, manager: ManagerHandle, event: &sys::libvlc_event_t) -> usize {
    let targets: Vec<Attachment> = attachments
        .get(&(manager, event.type_))
        .map(|entry| entry.value().clone())
        .unwrap_or_default();

    for (callback, token) in &targets {
        callback(event, *token as *mut c_void);
    }
    targets.len()
}

fn spawn_native_worker(attachments: Arc<AttachmentMap>) -> std::io::Result<Worker> {
    let (tx, rx) = channel::unbounded::<Command>();
    let handle = thread::Builder::new()
        .name("vlc-loopback-native".to_string())
        .spawn(move || {
            tracing::debug!("Loopback native worker started");
            for command in rx {
                match command {
                    Command::Emit { manager, event } => {
                        // SAFETY: `emit_on_worker` callers keep payload pointers alive.
                        unsafe { fire(&attachments, manager, &event.0) };
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                    Command::Shutdown => break,
                }
            }
            tracing::debug!("Loopback native worker stopped");
        })?;
    Ok(Worker { tx, handle })
}

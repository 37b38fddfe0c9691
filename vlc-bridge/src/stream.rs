//! Reader-backed media
//!
//! A [`MediaStream`] stores a `Read + Seek` value in the instance's object
//! registry. Native code only sees the [`ObjectId`] as its opaque pointer and
//! reaches the reader through the four `libvlc_media_*_cb` callbacks below.
//! Every handle (and every native media created from one) holds one
//! reference; the handle releasing the last reference drops the reader.

use std::io::{self, Read, Seek, SeekFrom};
use std::os::raw::{c_int, c_uchar, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use vlc_registry::{ObjectId, Release};

use crate::error::{BridgeError, Result};
use crate::event::NativeRef;
use crate::instance::{self, Instance};
use crate::native::MediaCallbacks;

/// Anything a media stream can read from
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

struct StreamSource {
    reader: Mutex<Box<dyn ReadSeek>>,
}

/// A registered reader shared with native code
pub struct MediaStream {
    instance: Weak<Instance>,
    id: ObjectId,
}

impl MediaStream {
    /// Register `reader` with a reference count of one
    pub fn register<R>(instance: &Arc<Instance>, reader: R) -> Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        if instance.is_released() {
            return Err(BridgeError::NotInitialized);
        }
        let id = instance.objects().add(StreamSource {
            reader: Mutex::new(Box::new(reader)),
        });
        tracing::debug!("Registered media stream {}", id);
        Ok(Self {
            instance: Arc::downgrade(instance),
            id,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Value native code receives as the callbacks' opaque pointer
    pub fn opaque(&self) -> *mut c_void {
        self.id.as_opaque()
    }

    /// Current number of handles sharing the reader
    pub fn ref_count(&self) -> Option<u32> {
        self.instance()
            .ok()
            .and_then(|instance| instance.objects().ref_count(self.id))
    }

    /// Another handle on the same reader
    pub fn duplicate(&self) -> Result<Self> {
        let instance = self.instance()?;
        instance
            .objects()
            .inc_refs(self.id)
            .ok_or(BridgeError::UnknownObject(self.id))?;
        Ok(Self {
            instance: self.instance.clone(),
            id: self.id,
        })
    }

    /// The callbacks to hand to `libvlc_media_new_callbacks`
    pub fn callbacks() -> MediaCallbacks {
        MediaCallbacks {
            open: Some(media_open_cb),
            read: Some(media_read_cb),
            seek: Some(media_seek_cb),
            close: Some(media_close_cb),
        }
    }

    /// Create a native media reading from this stream
    ///
    /// The media holds its own reference on the reader until it is dropped.
    pub fn create_media(&self) -> Result<StreamMedia> {
        let stream = self.duplicate()?;
        let instance = stream.instance()?;
        let opaque = stream.id.as_opaque() as usize;

        match instance.backend().new_callback_media(Self::callbacks(), opaque) {
            Some(media) => {
                tracing::debug!("Created native media {} for stream {}", media, stream.id);
                Ok(StreamMedia {
                    media,
                    stream: Some(stream),
                })
            }
            None => {
                let message = instance
                    .backend()
                    .take_last_error()
                    .unwrap_or_else(|| "could not create callback media".to_string());
                Err(BridgeError::Native(message))
            }
        }
    }

    fn instance(&self) -> Result<Arc<Instance>> {
        self.instance
            .upgrade()
            .filter(|instance| !instance.is_released())
            .ok_or(BridgeError::NotInitialized)
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        let Some(instance) = self.instance.upgrade() else {
            return;
        };
        match instance.objects().dec_refs(self.id) {
            Release::Removed(source) => {
                drop(source);
                tracing::debug!("Closed media stream {}", self.id);
            }
            Release::Retained(left) => {
                tracing::trace!("Media stream {} still has {} references", self.id, left);
            }
            Release::NotFound => {}
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// A native media object backed by a [`MediaStream`]
#[derive(Debug)]
pub struct StreamMedia {
    media: NativeRef,
    stream: Option<MediaStream>,
}

impl StreamMedia {
    /// The native `libvlc_media_t`
    pub fn native(&self) -> NativeRef {
        self.media
    }
}

impl Drop for StreamMedia {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Ok(instance) = stream.instance() {
                instance.backend().release_media(self.media);
            }
        }
    }
}

fn with_reader<T>(
    instance: &Instance,
    opaque: *mut c_void,
    op: impl FnOnce(&mut dyn ReadSeek) -> io::Result<T>,
) -> Option<io::Result<T>> {
    let id = ObjectId::from_opaque(opaque);
    let Some(source) = instance.objects().get_as::<StreamSource>(id) else {
        tracing::warn!("Media callback for unknown stream {}", id);
        return None;
    };
    let mut reader = source.reader.lock();
    Some(op(reader.as_mut()))
}

fn open_stream(instance: &Instance, opaque: *mut c_void) -> Option<u64> {
    let result = with_reader(instance, opaque, |reader| {
        let size = reader.seek(SeekFrom::End(0)).unwrap_or(u64::MAX);
        reader.seek(SeekFrom::Start(0))?;
        Ok(size)
    })?;
    result
        .map_err(|e| tracing::warn!("Rewinding media stream failed: {}", e))
        .ok()
}

fn read_stream(instance: &Instance, opaque: *mut c_void, buf: &mut [u8]) -> isize {
    let result = with_reader(instance, opaque, |reader| loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => break other,
        }
    });
    match result {
        Some(Ok(n)) => n as isize,
        Some(Err(e)) => {
            tracing::warn!("Reading media stream failed: {}", e);
            -1
        }
        None => -1,
    }
}

fn seek_stream(instance: &Instance, opaque: *mut c_void, offset: u64) -> bool {
    match with_reader(instance, opaque, |reader| reader.seek(SeekFrom::Start(offset))) {
        Some(Ok(_)) => true,
        Some(Err(e)) => {
            tracing::warn!("Seeking media stream to {} failed: {}", offset, e);
            false
        }
        None => false,
    }
}

fn guarded<T>(failure: T, op: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(op)).unwrap_or_else(|_| {
        tracing::error!("Media callback panicked");
        failure
    })
}

/// `libvlc_media_open_cb`: returns 0 on success, 1 on failure
///
/// # Safety
///
/// `datap` and `sizep` must be valid for writes.
pub unsafe extern "C" fn media_open_cb(
    opaque: *mut c_void,
    datap: *mut *mut c_void,
    sizep: *mut u64,
) -> c_int {
    guarded(1, || {
        let Some(instance) = instance::current_instance() else {
            return 1;
        };
        let Some(size) = open_stream(&instance, opaque) else {
            return 1;
        };
        if !datap.is_null() {
            *datap = opaque;
        }
        if !sizep.is_null() {
            *sizep = size;
        }
        0
    })
}

/// `libvlc_media_read_cb`: byte count, 0 at end of stream, -1 on error
///
/// # Safety
///
/// `buf` must be valid for `len` bytes of writes.
pub unsafe extern "C" fn media_read_cb(opaque: *mut c_void, buf: *mut c_uchar, len: usize) -> isize {
    guarded(-1, || {
        let Some(instance) = instance::current_instance() else {
            return -1;
        };
        if buf.is_null() {
            return -1;
        }
        let buf = std::slice::from_raw_parts_mut(buf, len);
        read_stream(&instance, opaque, buf)
    })
}

/// `libvlc_media_seek_cb`: 0 on success, -1 on error
///
/// # Safety
///
/// Called by native code only.
pub unsafe extern "C" fn media_seek_cb(opaque: *mut c_void, offset: u64) -> c_int {
    guarded(-1, || {
        let Some(instance) = instance::current_instance() else {
            return -1;
        };
        if seek_stream(&instance, opaque, offset) {
            0
        } else {
            -1
        }
    })
}

/// `libvlc_media_close_cb`: the reader lives as long as its handles
///
/// # Safety
///
/// Called by native code only.
pub unsafe extern "C" fn media_close_cb(_opaque: *mut c_void) {}

//! Instance lifecycle
//!
//! An [`Instance`] owns the native backend together with the two registries.
//! One instance at a time can be installed as the process-wide current
//! instance; the dispatch trampoline and the media stream callbacks resolve
//! it there, because the native side only hands them a token. Everything
//! else holds an explicit reference.
//!
//! ```rust
//! use std::sync::Arc;
//! use vlc_bridge::{Instance, InstanceConfig, LoopbackBackend};
//!
//! # fn main() -> vlc_bridge::Result<()> {
//! let backend = Arc::new(LoopbackBackend::new());
//! let instance = Instance::builder()
//!     .config(InstanceConfig::new().with_args(["--no-video"]))
//!     .backend(backend.clone())
//!     .build_detached()?;
//!
//! let manager = instance.event_manager(backend.new_manager());
//! assert!(manager.registrations().is_empty());
//! instance.release()?;
//! # Ok(())
//! # }
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use vlc_registry::{EventRegistry, ObjectRegistry};
use vlc_sys as sys;

use crate::config::InstanceConfig;
use crate::dispatch::event_dispatch;
use crate::error::{BridgeError, Result};
use crate::manager::{EventContext, EventManager};
use crate::native::{ManagerHandle, NativeBackend};

type BackendFactory = Box<dyn FnOnce(&InstanceConfig) -> Result<Arc<dyn NativeBackend>> + Send>;
type ThreadHook = Arc<dyn Fn() + Send + Sync>;

static CURRENT: RwLock<Option<Arc<Instance>>> = parking_lot::const_rwlock(None);
static GENERATION: AtomicU64 = AtomicU64::new(1);
/// Last event token issued by any instance. Native objects can outlive the
/// instance that attached to them, so tokens are never reused process-wide.
static EVENT_TOKENS: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Generation of the instance that last dispatched on this thread
    static LAST_ENTERED: Cell<u64> = const { Cell::new(0) };
}

/// Native library handle plus the registries shared by every manager
pub struct Instance {
    generation: u64,
    config: InstanceConfig,
    backend: Arc<dyn NativeBackend>,
    events: EventRegistry<EventContext>,
    objects: ObjectRegistry,
    released: AtomicBool,
    on_native_thread: Option<ThreadHook>,
}

impl Instance {
    /// Start configuring an instance
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Process-unique number identifying this instance
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn NativeBackend> {
        &self.backend
    }

    /// Live event registrations
    pub fn events(&self) -> &EventRegistry<EventContext> {
        &self.events
    }

    /// Values addressed by native code through an `ObjectId`
    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Event manager facade for a native handle owned by this instance
    pub fn event_manager(self: &Arc<Self>, handle: ManagerHandle) -> EventManager {
        EventManager::new(Arc::downgrade(self), handle)
    }

    /// Event manager facade for a raw native pointer
    ///
    /// Fails with [`BridgeError::MissingEventManager`] for a null pointer,
    /// as returned by libvlc for objects without events.
    pub fn event_manager_for(
        self: &Arc<Self>,
        ptr: *mut sys::libvlc_event_manager_t,
    ) -> Result<EventManager> {
        let handle = ManagerHandle::from_ptr(ptr).ok_or(BridgeError::MissingEventManager)?;
        Ok(self.event_manager(handle))
    }

    /// Whether this instance is the installed process-wide one
    pub fn is_current(&self) -> bool {
        CURRENT
            .read()
            .as_ref()
            .map_or(false, |current| current.generation == self.generation)
    }

    /// Release the native instance
    ///
    /// Live registrations are detached natively first, since players and
    /// medias may outlive the instance. Every manager and stream bound to
    /// this instance reports [`BridgeError::NotInitialized`] afterwards.
    /// Releasing twice is a no-op. A pending native error message is
    /// returned as [`BridgeError::Native`].
    pub fn release(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        {
            let mut current = CURRENT.write();
            if current.as_ref().map_or(false, |c| c.generation == self.generation) {
                *current = None;
            }
        }

        let live_events = self.events.drain();
        if !live_events.is_empty() {
            tracing::warn!(
                "Releasing instance {} with {} live event registrations",
                self.generation,
                live_events.len()
            );
        }
        for (id, context) in &live_events {
            if let Some(token) = id.to_token() {
                self.backend
                    .detach(context.manager, context.kind.code(), event_dispatch, token);
            }
        }
        let live_objects = self.objects.drain();
        if !live_objects.is_empty() {
            tracing::debug!(
                "Dropping {} registered objects of instance {}",
                live_objects.len(),
                self.generation
            );
        }

        self.backend.shutdown();
        tracing::info!("Released instance {}", self.generation);

        match self.backend.take_last_error() {
            Some(message) => Err(BridgeError::Native(message)),
            None => Ok(()),
        }
    }

    /// Run the native-thread hook if another instance (or none) last
    /// dispatched on this thread
    pub(crate) fn enter_native_thread(&self) {
        let first = LAST_ENTERED.with(|last| last.replace(self.generation) != self.generation);
        if first {
            tracing::trace!(
                thread = ?std::thread::current().id(),
                "First dispatch on thread for instance {}",
                self.generation
            );
            if let Some(hook) = &self.on_native_thread {
                hook();
            }
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("generation", &self.generation)
            .field("events", &self.events.len())
            .field("objects", &self.objects.len())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Builder for [`Instance`]
#[derive(Default)]
pub struct InstanceBuilder {
    config: InstanceConfig,
    backend: Option<Arc<dyn NativeBackend>>,
    factory: Option<BackendFactory>,
    on_native_thread: Option<ThreadHook>,
}

impl InstanceBuilder {
    pub fn config(mut self, config: InstanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an already constructed backend
    pub fn backend(mut self, backend: Arc<dyn NativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Construct the backend from the final configuration
    ///
    /// Only invoked when no instance is installed yet.
    pub fn backend_factory<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(&InstanceConfig) -> Result<Arc<dyn NativeBackend>> + Send + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Hook run once per native thread before its first callback
    pub fn on_native_thread<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_native_thread = Some(Arc::new(hook));
        self
    }

    /// Install the instance process-wide
    ///
    /// Idempotent: when an instance is already installed it is returned
    /// unchanged and this builder is discarded.
    pub fn init(self) -> Result<Arc<Instance>> {
        let mut current = CURRENT.write();
        if let Some(existing) = current.as_ref() {
            tracing::debug!("Instance {} already initialized", existing.generation);
            return Ok(Arc::clone(existing));
        }

        let instance = Arc::new(self.build()?);
        *current = Some(Arc::clone(&instance));
        tracing::info!("Initialized instance {}", instance.generation);
        Ok(instance)
    }

    /// Build an instance without installing it
    ///
    /// Native callbacks cannot reach a detached instance on their own; feed
    /// it events with [`Instance::dispatch`].
    pub fn build_detached(self) -> Result<Arc<Instance>> {
        let instance = Arc::new(self.build()?);
        tracing::debug!("Built detached instance {}", instance.generation);
        Ok(instance)
    }

    fn build(self) -> Result<Instance> {
        let config = self.config;
        let backend = match (self.backend, self.factory) {
            (Some(backend), _) => backend,
            (None, Some(factory)) => factory(&config)?,
            (None, None) => default_backend(&config)?,
        };

        Ok(Instance {
            generation: GENERATION.fetch_add(1, Ordering::Relaxed),
            config,
            backend,
            events: EventRegistry::with_sequence(&EVENT_TOKENS),
            objects: ObjectRegistry::new(),
            released: AtomicBool::new(false),
            on_native_thread: self.on_native_thread,
        })
    }
}

#[cfg(feature = "libvlc")]
fn default_backend(config: &InstanceConfig) -> Result<Arc<dyn NativeBackend>> {
    Ok(Arc::new(crate::native::LibVlcBackend::new(config)?))
}

#[cfg(not(feature = "libvlc"))]
fn default_backend(_config: &InstanceConfig) -> Result<Arc<dyn NativeBackend>> {
    Ok(Arc::new(crate::native::LoopbackBackend::new()))
}

/// Initialize the process-wide instance
///
/// A second call while initialized is a no-op success returning the
/// existing instance.
pub fn init(config: InstanceConfig, backend: Arc<dyn NativeBackend>) -> Result<Arc<Instance>> {
    Instance::builder().config(config).backend(backend).init()
}

/// Release the process-wide instance; a no-op when none is installed
pub fn release() -> Result<()> {
    let taken = CURRENT.write().take();
    match taken {
        Some(instance) => instance.release(),
        None => Ok(()),
    }
}

/// The process-wide instance
pub fn current() -> Result<Arc<Instance>> {
    current_instance().ok_or(BridgeError::NotInitialized)
}

pub(crate) fn current_instance() -> Option<Arc<Instance>> {
    CURRENT
        .read()
        .as_ref()
        .filter(|instance| !instance.is_released())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_kind::EventKind;
    use crate::native::LoopbackBackend;
    use std::sync::atomic::AtomicUsize;

    fn detached() -> Arc<Instance> {
        Instance::builder()
            .backend(Arc::new(LoopbackBackend::new()))
            .build_detached()
            .unwrap()
    }

    #[test]
    fn test_generations_are_unique() {
        let a = detached();
        let b = detached();
        assert_ne!(a.generation(), b.generation());
        assert!(!a.is_current());
    }

    #[test]
    fn test_release_is_idempotent_and_drains() {
        let instance = detached();
        instance.objects().add(5u8);
        instance.release().unwrap();
        assert!(instance.is_released());
        assert!(instance.objects().is_empty());
        instance.release().unwrap();
    }

    #[test]
    fn test_release_surfaces_pending_native_error() {
        let backend = Arc::new(LoopbackBackend::new());
        let instance = Instance::builder()
            .backend(backend.clone())
            .build_detached()
            .unwrap();
        backend.set_last_error("module bank corrupted");

        match instance.release() {
            Err(BridgeError::Native(message)) => assert_eq!(message, "module bank corrupted"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_backend_factory_sees_config() {
        let instance = Instance::builder()
            .config(InstanceConfig::new().with_args(["--quiet"]))
            .backend_factory(|config| {
                assert_eq!(config.args, vec!["--quiet"]);
                Ok(Arc::new(LoopbackBackend::new()) as Arc<dyn NativeBackend>)
            })
            .build_detached()
            .unwrap();
        assert_eq!(instance.config().args, vec!["--quiet"]);
    }

    #[test]
    fn test_factory_error_propagates() {
        let result = Instance::builder()
            .backend_factory(|_| Err(BridgeError::InstanceCreation("no plugins".into())))
            .build_detached();
        assert!(matches!(result, Err(BridgeError::InstanceCreation(_))));
    }

    #[test]
    fn test_native_thread_hook_reruns_when_instance_changes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let instance = Instance::builder()
            .backend(Arc::new(LoopbackBackend::new()))
            .on_native_thread(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build_detached()
            .unwrap();

        instance.enter_native_thread();
        instance.enter_native_thread();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Another instance dispatching here makes the next entry count again
        detached().enter_native_thread();
        instance.enter_native_thread();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let worker = Arc::clone(&instance);
        std::thread::spawn(move || {
            worker.enter_native_thread();
            worker.enter_native_thread();
        })
        .join()
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_release_detaches_live_registrations() {
        let backend = Arc::new(LoopbackBackend::new());
        let instance = Instance::builder()
            .backend(backend.clone())
            .build_detached()
            .unwrap();
        let player = instance.event_manager(backend.new_manager());
        player.attach(EventKind::PlayerPlaying, |_, _| {}, None).unwrap();
        player.attach(EventKind::PlayerPaused, |_, _| {}, None).unwrap();
        assert_eq!(backend.attachment_count(), 2);

        instance.release().unwrap();
        assert_eq!(backend.attachment_count(), 0);
    }

    #[test]
    fn test_tokens_are_unique_across_instances() {
        let a = detached();
        let b = detached();
        let handle = ManagerHandle::from_raw(0x100);

        let first = a
            .event_manager(handle)
            .attach(EventKind::PlayerPlaying, |_, _| {}, None)
            .unwrap();
        a.release().unwrap();
        let second = b
            .event_manager(handle)
            .attach(EventKind::PlayerPlaying, |_, _| {}, None)
            .unwrap();
        assert!(second > first);
        assert!(!b.events().contains(first));
    }

    #[test]
    fn test_null_event_manager_is_rejected() {
        let instance = detached();
        assert!(matches!(
            instance.event_manager_for(std::ptr::null_mut()),
            Err(BridgeError::MissingEventManager)
        ));
    }
}

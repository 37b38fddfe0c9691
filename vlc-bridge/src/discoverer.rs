//! Renderer discovery (Chromecast and friends)
//!
//! Renderer items announced by a discoverer are only valid during the event
//! unless retained, so every announced item is held natively and recorded in
//! the object registry until it is deleted or discovery stops.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use vlc_registry::{EventId, ObjectId};

use crate::error::Result;
use crate::event::{Event, EventPayload, NativeRef};
use crate::event_kind::EventKind;
use crate::instance::Instance;
use crate::manager::EventManager;

/// Called with `RendererDiscovererItemAdded` or `RendererDiscovererItemDeleted`
pub type DiscoveryCallback = Arc<dyn Fn(EventKind, &RendererItem) + Send + Sync>;

/// A renderer item retained by a discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RendererItem {
    id: ObjectId,
    native: NativeRef,
}

impl RendererItem {
    /// Registry id of the retained item
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The native `libvlc_renderer_item_t`
    pub fn native(&self) -> NativeRef {
        self.native
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Stopped,
    /// Attaches in flight; events may already arrive
    Starting,
    Running,
}

#[derive(Default)]
struct DiscoveryState {
    phase: Phase,
    /// Bumped by every start, so a start only commits its own attempt
    epoch: u64,
    ids: Vec<EventId>,
    items: HashMap<NativeRef, ObjectId>,
}

/// Tracks the renderers announced on a discoverer's event manager
pub struct RendererDiscovery {
    manager: EventManager,
    state: Arc<Mutex<DiscoveryState>>,
}

impl RendererDiscovery {
    pub fn new(manager: EventManager) -> Self {
        Self {
            manager,
            state: Arc::new(Mutex::new(DiscoveryState::default())),
        }
    }

    /// Attach to item added and deleted events
    ///
    /// A started discovery is left untouched. When the second attach fails
    /// the first one is detached again. The state lock is not held across
    /// the native attach calls: native code may be delivering an event for
    /// the first attachment while the second one is made.
    pub fn start<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(EventKind, &RendererItem) + Send + Sync + 'static,
    {
        let epoch = {
            let mut state = self.state.lock();
            if state.phase != Phase::Stopped {
                return Ok(());
            }
            state.phase = Phase::Starting;
            state.epoch += 1;
            state.epoch
        };

        let callback: DiscoveryCallback = Arc::new(callback);
        let mut ids = Vec::with_capacity(2);
        for kind in [
            EventKind::RendererDiscovererItemAdded,
            EventKind::RendererDiscovererItemDeleted,
        ] {
            let manager = self.manager.clone();
            let shared = Arc::clone(&self.state);
            let callback = Arc::clone(&callback);
            let attached = self.manager.attach(
                kind,
                move |event, _| on_item(&manager, &shared, &callback, event),
                None,
            );

            match attached {
                Ok(id) => ids.push(id),
                Err(e) => {
                    let items = {
                        let mut state = self.state.lock();
                        if state.epoch != epoch {
                            HashMap::new()
                        } else {
                            state.phase = Phase::Stopped;
                            std::mem::take(&mut state.items)
                        }
                    };
                    if let Err(detach_err) = self.teardown(ids, items) {
                        tracing::debug!("Rollback detach failed: {}", detach_err);
                    }
                    return Err(e);
                }
            }
        }

        let raced = {
            let mut state = self.state.lock();
            if state.phase == Phase::Starting && state.epoch == epoch {
                state.phase = Phase::Running;
                state.ids = ids;
                None
            } else if state.epoch == epoch {
                Some((ids, std::mem::take(&mut state.items)))
            } else {
                // A later start owns the state now
                Some((ids, HashMap::new()))
            }
        };

        match raced {
            None => {
                tracing::info!("Renderer discovery started on {}", self.manager.handle());
                Ok(())
            }
            Some((ids, items)) => {
                tracing::debug!(
                    "Renderer discovery stopped while starting on {}",
                    self.manager.handle()
                );
                self.teardown(ids, items)
            }
        }
    }

    /// Detach and release every retained item
    pub fn stop(&self) -> Result<()> {
        let (ids, items) = {
            let mut state = self.state.lock();
            if state.phase == Phase::Stopped {
                return Ok(());
            }
            // A start in flight sees this and undoes its own attaches.
            state.phase = Phase::Stopped;
            (std::mem::take(&mut state.ids), std::mem::take(&mut state.items))
        };

        let detached = self.teardown(ids, items);
        tracing::info!("Renderer discovery stopped on {}", self.manager.handle());
        detached
    }

    fn teardown(&self, ids: Vec<EventId>, items: HashMap<NativeRef, ObjectId>) -> Result<()> {
        let detached = self.manager.detach(ids);
        if let Ok(instance) = self.manager.instance() {
            for (native, id) in items {
                forget(&instance, RendererItem { id, native });
            }
        }
        detached
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().phase == Phase::Running
    }

    /// Currently retained items
    pub fn renderers(&self) -> Vec<RendererItem> {
        let mut items: Vec<_> = self
            .state
            .lock()
            .items
            .iter()
            .map(|(native, id)| RendererItem {
                id: *id,
                native: *native,
            })
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    /// Resolve a retained item by registry id
    pub fn renderer(&self, id: ObjectId) -> Option<RendererItem> {
        let instance = self.manager.instance().ok()?;
        let native = instance.objects().get_as::<NativeRef>(id)?;
        Some(RendererItem {
            id,
            native: *native,
        })
    }
}

impl Drop for RendererDiscovery {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::debug!("Renderer discovery dropped after release: {}", e);
        }
    }
}

impl fmt::Debug for RendererDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RendererDiscovery")
            .field("manager", &self.manager.handle())
            .field("phase", &state.phase)
            .field("renderers", &state.items.len())
            .finish()
    }
}

fn on_item(
    manager: &EventManager,
    state: &Mutex<DiscoveryState>,
    callback: &DiscoveryCallback,
    event: &Event,
) {
    let EventPayload::Renderer(native) = event.payload else {
        return;
    };
    if native.is_null() {
        return;
    }
    let Ok(instance) = manager.instance() else {
        return;
    };

    let item = {
        let mut state = state.lock();
        if state.phase == Phase::Stopped {
            return;
        }
        let id = *state.items.entry(native).or_insert_with(|| {
            instance.backend().hold_renderer_item(native);
            instance.objects().add(native)
        });
        RendererItem { id, native }
    };

    // Lock released: the callback may call back into the discovery.
    callback(event.kind, &item);

    if event.kind == EventKind::RendererDiscovererItemDeleted
        && state.lock().items.remove(&native).is_some()
    {
        forget(&instance, item);
    }
}

fn forget(instance: &Instance, item: RendererItem) {
    instance.objects().dec_refs(item.id);
    instance.backend().release_renderer_item(item.native);
    tracing::debug!("Released renderer {} ({})", item.native, item.id);
}

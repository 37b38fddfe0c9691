//! # vlc-bridge - libvlc Events as Rust Closures
//!
//! Lets libvlc call back into Rust from its own threads without handing it
//! a single Rust address:
//!
//! ```rust
//! use std::sync::Arc;
//! use vlc_bridge::{EventKind, EventPayload, InstanceConfig, LoopbackBackend};
//!
//! fn main() -> vlc_bridge::Result<()> {
//!     let backend = Arc::new(LoopbackBackend::new());
//!     let instance = vlc_bridge::init(InstanceConfig::default(), backend.clone())?;
//!
//!     let list = instance.event_manager(backend.new_manager());
//!     let added = list.subscribe(EventKind::MediaListItemAdded)?;
//!
//!     let id = list.attach(
//!         EventKind::MediaListEndReached,
//!         |event, _user_data| println!("{:?} finished", event.source),
//!         None,
//!     )?;
//!
//!     backend.emit_empty(list.handle(), EventKind::MediaListItemAdded.code());
//!     let event = added.recv().expect("event");
//!     assert!(matches!(event.payload, EventPayload::ListItem { .. }));
//!
//!     list.detach([id])?;
//!     list.detach([id])?; // idempotent
//!     drop(added);
//!
//!     vlc_bridge::release()
//! }
//! ```
//!
//! ## Key Features
//!
//! - **Token dispatch**: native code only sees a monotonic `EventId`, so a
//!   late event for a detached registration is dropped instead of chasing a
//!   dangling pointer
//! - **No orphaned state**: a failed native attach rolls its registry entry
//!   back; detach is idempotent
//! - **Reentrant callbacks**: callbacks run outside every lock and may
//!   attach or detach, including themselves
//! - **Panic containment**: nothing unwinds into native frames
//! - **Reference-counted objects**: readers and renderer items stay alive
//!   exactly as long as a native retaining path exists
//!
//! ## Architecture
//!
//! ```text
//! libvlc thread ──► event_dispatch (extern "C")
//!                       │ token
//!                       ▼
//!                  EventRegistry ──► callback(&Event, &UserData)
//!                       ▲
//! EventManager ─────────┘ attach / detach ──► NativeBackend (libvlc | loopback)
//!
//! MediaStream ──► ObjectRegistry ◄── media_{open,read,seek,close}_cb
//! ```

pub use vlc_registry::{EventId, EventRegistry, ObjectId, ObjectRegistry, Release};
pub use vlc_sys as sys;

pub use config::{AppName, ConfigError, InstanceConfig};
pub use discoverer::{DiscoveryCallback, RendererDiscovery, RendererItem};
pub use dispatch::event_dispatch;
pub use error::{BridgeError, Result};
pub use event::{Event, EventPayload, NativeRef};
pub use event_kind::{EventCategory, EventKind};
pub use instance::{current, init, release, Instance, InstanceBuilder};
pub use iter::{EventSubscription, TimeoutIterator, TryIterator};
pub use manager::{EventCallback, EventContext, EventManager, UserData};
#[cfg(feature = "libvlc")]
pub use native::LibVlcBackend;
pub use native::{LoopbackBackend, ManagerHandle, MediaCallbacks, NativeBackend, TrampolineFn};
pub use stream::{MediaStream, ReadSeek, StreamMedia};

pub mod config;
pub mod event;
pub mod event_kind;
pub mod logging;
pub mod native;
pub mod stream;

mod discoverer;
mod dispatch;
mod error;
mod instance;
mod iter;
mod manager;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeError, Event, EventId, EventKind, EventManager, EventPayload, Instance,
        InstanceConfig, NativeBackend, Result, UserData,
    };
}

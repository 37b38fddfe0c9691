//! Native Callback Registries
//!
//! Thread-safe registries that let native code refer to managed values by a
//! pointer-sized integer instead of an address.
//!
//! # Features
//!
//! - **Monotonic Tokens**: `EventId`s are never reused, so a stale token can
//!   never alias a newer registration
//! - **Lock-free Callbacks**: lookups clone the context out of the lock
//! - **Reference Counting**: `ObjectRegistry` keeps a value reachable for as
//!   long as native code holds a retaining path to it
//! - **Absence Is Not an Error**: unknown ids are answered with `None`
//!
//! # Quick Start
//!
//! ```rust
//! use vlc_registry::{EventRegistry, ObjectRegistry, Release};
//!
//! let events = EventRegistry::new();
//! let token = events.add("media-ended");
//! assert_eq!(events.get(token), Some("media-ended"));
//! events.remove(token);
//! events.remove(token); // idempotent
//!
//! let objects = ObjectRegistry::new();
//! let id = objects.add(String::from("stream reader"));
//! objects.inc_refs(id);
//! assert!(matches!(objects.dec_refs(id), Release::Retained(1)));
//! assert!(objects.dec_refs(id).is_removed());
//! ```
//!
//! # Architecture
//!
//! ```text
//! EventRegistry<C>                     ObjectRegistry
//!     │                                    │
//!     ├── RwLock                           ├── RwLock
//!     │     └── contexts: EventId -> C     │     ├── contexts: ObjectId -> { refs, data }
//!     ├── sequence: own or shared AtomicU64│     └── sequence: u64
//!     │                                    │
//!     └── token 0 reserved                 └── removal on refs == 0
//! ```

pub mod events;
pub mod id;
pub mod objects;

pub use events::EventRegistry;
pub use id::{EventId, ObjectId};
pub use objects::{ObjectData, ObjectRegistry, Release};

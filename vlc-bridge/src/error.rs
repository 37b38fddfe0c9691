use thiserror::Error;

use crate::config::ConfigError;
use crate::event_kind::EventKind;
use vlc_registry::{EventId, ObjectId};

/// Errors surfaced by the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The instance was never initialized or has been released
    #[error("Instance not initialized")]
    NotInitialized,

    /// A missing callback was passed to attach
    #[error("Invalid event callback")]
    InvalidCallback,

    /// The native attach call reported failure
    #[error("Failed to attach {kind:?} event: {message}")]
    AttachFailed { kind: EventKind, message: String },

    /// A native handle did not expose an event manager
    #[error("Could not get event manager instance")]
    MissingEventManager,

    /// The native instance could not be created
    #[error("Could not initialize native instance: {0}")]
    InstanceCreation(String),

    /// A native call left an error message behind
    #[error("Native error: {0}")]
    Native(String),

    /// The token does not fit in the native pointer width
    #[error("Token {0} does not fit in a native pointer")]
    TokenOverflow(EventId),

    /// An object id was expected to be live but was not
    #[error("Object {0} is not registered")]
    UnknownObject(ObjectId),

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

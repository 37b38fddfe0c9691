//! Opaque identifiers handed across the native boundary

use std::os::raw::c_void;

/// Identifies one attach registration.
///
/// Values come from a per-registry monotonic sequence starting at 1 and are
/// never reused. `0` is reserved to mean "no token".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    /// The reserved "no callback" token
    pub const NONE: EventId = EventId(0);

    /// Create an EventId with the given raw value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved zero token
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Pointer-width token for native user data, if the value fits
    pub fn to_token(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Recover an EventId from a native user-data pointer
    pub fn from_user_data(user_data: *mut c_void) -> Self {
        Self(user_data as usize as u64)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt-{}", self.0)
    }
}

/// Identifies a reference-counted value held in an [`ObjectRegistry`].
///
/// Allocated from its own sequence, so an `ObjectId` and an `EventId` with the
/// same numeric value are unrelated.
///
/// [`ObjectRegistry`]: crate::ObjectRegistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The reserved "no object" id
    pub const NONE: ObjectId = ObjectId(0);

    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Encode as the `void*` opaque value native callbacks carry
    pub fn as_opaque(&self) -> *mut c_void {
        self.0 as usize as *mut c_void
    }

    /// Decode an opaque value previously produced by [`ObjectId::as_opaque`]
    pub fn from_opaque(opaque: *mut c_void) -> Self {
        Self(opaque as usize as u64)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

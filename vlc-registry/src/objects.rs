//! Reference-counted object registry
//!
//! Holds managed values that native code refers to by an opaque
//! [`ObjectId`]. An entry lives while its count is positive; the decrement
//! that reaches zero removes it physically and hands the value back to the
//! caller, who owns its teardown.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::id::ObjectId;

/// Type-erased value stored in the registry
pub type ObjectData = Arc<dyn Any + Send + Sync>;

struct ObjectContext {
    refs: u32,
    data: ObjectData,
}

struct Inner {
    contexts: HashMap<ObjectId, ObjectContext>,
    sequence: u64,
}

/// Outcome of [`ObjectRegistry::dec_refs`]
#[derive(Clone)]
pub enum Release {
    /// The id was not registered (already removed, or never added)
    NotFound,
    /// The entry is still held; carries the remaining count
    Retained(u32),
    /// The count reached zero and the entry was removed
    Removed(ObjectData),
}

impl Release {
    /// Whether this call removed the entry
    pub fn is_removed(&self) -> bool {
        matches!(self, Release::Removed(_))
    }
}

impl std::fmt::Debug for Release {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Release::NotFound => write!(f, "NotFound"),
            Release::Retained(refs) => write!(f, "Retained({})", refs),
            Release::Removed(_) => write!(f, "Removed"),
        }
    }
}

/// Thread-safe registry of reference-counted values
///
/// Every mutation happens under a single write guard, so a decrement to zero
/// and a concurrent increment are ordered: once the entry is gone, the
/// increment reports "not found" instead of resurrecting it.
pub struct ObjectRegistry {
    inner: RwLock<Inner>,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                contexts: HashMap::new(),
                sequence: 0,
            }),
        }
    }

    /// Register a value with a reference count of one
    pub fn add<T>(&self, data: T) -> ObjectId
    where
        T: Any + Send + Sync,
    {
        self.add_shared(Arc::new(data))
    }

    /// Register an already shared value with a reference count of one
    pub fn add_shared(&self, data: ObjectData) -> ObjectId {
        let mut inner = self.inner.write();
        inner.sequence += 1;
        let id = ObjectId::new(inner.sequence);
        inner.contexts.insert(id, ObjectContext { refs: 1, data });

        tracing::trace!("Registered object {}", id);
        id
    }

    /// Get the stored value while its count is positive
    pub fn get(&self, id: ObjectId) -> Option<ObjectData> {
        if id.is_none() {
            return None;
        }

        self.inner
            .read()
            .contexts
            .get(&id)
            .map(|ctx| Arc::clone(&ctx.data))
    }

    /// Get the stored value downcast to `T`
    ///
    /// Returns `None` if the id is unknown or holds a different type.
    pub fn get_as<T>(&self, id: ObjectId) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        self.get(id).and_then(|data| data.downcast::<T>().ok())
    }

    /// Add a retaining path to an existing entry
    ///
    /// Returns the new count, or `None` (and does nothing) if the id is absent
    /// or the count is already at `u32::MAX`.
    pub fn inc_refs(&self, id: ObjectId) -> Option<u32> {
        if id.is_none() {
            return None;
        }

        let mut inner = self.inner.write();
        let ctx = inner.contexts.get_mut(&id)?;
        let Some(refs) = ctx.refs.checked_add(1) else {
            tracing::warn!("Object {} reference count saturated", id);
            return None;
        };
        ctx.refs = refs;

        tracing::trace!("Object {} reference count -> {}", id, ctx.refs);
        Some(ctx.refs)
    }

    /// Drop a retaining path, removing the entry when the count reaches zero
    pub fn dec_refs(&self, id: ObjectId) -> Release {
        if id.is_none() {
            return Release::NotFound;
        }

        let mut inner = self.inner.write();
        let Some(ctx) = inner.contexts.get_mut(&id) else {
            return Release::NotFound;
        };

        ctx.refs -= 1;
        if ctx.refs > 0 {
            tracing::trace!("Object {} reference count -> {}", id, ctx.refs);
            return Release::Retained(ctx.refs);
        }

        match inner.contexts.remove(&id) {
            Some(ctx) => {
                tracing::trace!("Object {} released", id);
                Release::Removed(ctx.data)
            }
            None => Release::NotFound,
        }
    }

    /// Current reference count of an entry
    pub fn ref_count(&self, id: ObjectId) -> Option<u32> {
        self.inner.read().contexts.get(&id).map(|ctx| ctx.refs)
    }

    /// Whether an entry is currently live
    pub fn contains(&self, id: ObjectId) -> bool {
        !id.is_none() && self.inner.read().contexts.contains_key(&id)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.read().contexts.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().contexts.is_empty()
    }

    /// Remove every entry regardless of count, returning the values
    pub fn drain(&self) -> Vec<(ObjectId, ObjectData)> {
        self.inner
            .write()
            .contexts
            .drain()
            .map(|(id, ctx)| (id, ctx.data))
            .collect()
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ObjectRegistry")
            .field("live", &inner.contexts.len())
            .field("sequence", &inner.sequence)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refcount_walkthrough() {
        let registry = ObjectRegistry::new();
        let id = registry.add(String::from("reader"));
        assert_eq!(registry.ref_count(id), Some(1));

        assert_eq!(registry.inc_refs(id), Some(2));

        assert!(matches!(registry.dec_refs(id), Release::Retained(1)));
        assert!(registry.get(id).is_some());

        let last = registry.dec_refs(id);
        assert!(last.is_removed());
        assert!(registry.get(id).is_none());

        // A third decrement is a safe no-op
        assert!(matches!(registry.dec_refs(id), Release::NotFound));
    }

    #[test]
    fn test_inc_after_removal_does_not_resurrect() {
        let registry = ObjectRegistry::new();
        let id = registry.add(1u64);

        assert!(registry.dec_refs(id).is_removed());
        assert_eq!(registry.inc_refs(id), None);
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_removed_value_is_handed_back() {
        let registry = ObjectRegistry::new();
        let id = registry.add(vec![1u8, 2, 3]);

        match registry.dec_refs(id) {
            Release::Removed(data) => {
                let bytes = data.downcast::<Vec<u8>>().unwrap();
                assert_eq!(*bytes, vec![1, 2, 3]);
            }
            other => panic!("expected removal, got {:?}", other),
        }
    }

    #[test]
    fn test_inc_refs_at_limit_is_refused() {
        let registry = ObjectRegistry::new();
        let id = registry.add("busy");
        registry.inner.write().contexts.get_mut(&id).unwrap().refs = u32::MAX;

        assert_eq!(registry.inc_refs(id), None);
        assert_eq!(registry.ref_count(id), Some(u32::MAX));
        // The refused increment is not owed a decrement
        assert!(matches!(registry.dec_refs(id), Release::Retained(n) if n == u32::MAX - 1));
        assert!(registry.contains(id));
    }

    #[test]
    fn test_get_as_checks_type() {
        let registry = ObjectRegistry::new();
        let id = registry.add(3.5f32);

        assert_eq!(registry.get_as::<f32>(id).as_deref(), Some(&3.5));
        assert!(registry.get_as::<String>(id).is_none());
    }

    #[test]
    fn test_zero_id_is_absent() {
        let registry = ObjectRegistry::new();
        registry.add(());

        assert!(registry.get(ObjectId::NONE).is_none());
        assert_eq!(registry.inc_refs(ObjectId::NONE), None);
        assert!(matches!(registry.dec_refs(ObjectId::NONE), Release::NotFound));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_are_distinct_from_each_other() {
        let registry = ObjectRegistry::new();
        let a = registry.add(());
        let b = registry.add(());
        registry.dec_refs(a);
        let c = registry.add(());

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}

//! Token to callback-context registry
//!
//! `EventRegistry` owns every context that native code can reach through a
//! token. Lookups take the read lock; allocation and removal take the write
//! lock. Callers clone the context out and invoke it after the guard is gone,
//! so nothing user-supplied ever runs under the lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::id::EventId;

/// Where tokens come from: the registry's own counter, or one shared with
/// other registries so their tokens never collide
enum Sequence {
    Owned(AtomicU64),
    Shared(&'static AtomicU64),
}

impl Sequence {
    fn counter(&self) -> &AtomicU64 {
        match self {
            Sequence::Owned(counter) => counter,
            Sequence::Shared(counter) => *counter,
        }
    }
}

/// Thread-safe map from [`EventId`] to a callback context `C`.
///
/// Tokens are allocated from a monotonic sequence, so two `add` calls never
/// return the same id, even across interleaved removals. Registries built
/// with [`with_sequence`](Self::with_sequence) on the same counter never
/// return the same id either.
pub struct EventRegistry<C> {
    contexts: RwLock<HashMap<EventId, C>>,
    sequence: Sequence,
}

impl<C: Clone> EventRegistry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            sequence: Sequence::Owned(AtomicU64::new(0)),
        }
    }

    /// Create an empty registry drawing tokens from a shared counter
    ///
    /// The counter holds the last issued value.
    pub fn with_sequence(sequence: &'static AtomicU64) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            sequence: Sequence::Shared(sequence),
        }
    }

    /// Store a context and return its freshly minted token
    pub fn add(&self, context: C) -> EventId {
        let id = EventId::new(self.sequence.counter().fetch_add(1, Ordering::Relaxed) + 1);
        let mut contexts = self.contexts.write();
        contexts.insert(id, context);

        tracing::trace!("Registered event context {} ({} live)", id, contexts.len());
        id
    }

    /// Look up a context by token
    ///
    /// The reserved zero token is answered without touching the lock.
    pub fn get(&self, id: EventId) -> Option<C> {
        if id.is_none() {
            return None;
        }

        self.contexts.read().get(&id).cloned()
    }

    /// Remove a context, returning it if it was present
    ///
    /// Removing an unknown token is a silent no-op.
    pub fn remove(&self, id: EventId) -> Option<C> {
        if id.is_none() {
            return None;
        }

        let removed = self.contexts.write().remove(&id);
        if removed.is_some() {
            tracing::trace!("Removed event context {}", id);
        }
        removed
    }

    /// Remove a context only if `predicate` accepts it
    ///
    /// The check and the removal happen under one write guard.
    pub fn remove_if<F>(&self, id: EventId, predicate: F) -> Option<C>
    where
        F: FnOnce(&C) -> bool,
    {
        if id.is_none() {
            return None;
        }

        let mut contexts = self.contexts.write();
        match contexts.get(&id) {
            Some(context) if predicate(context) => contexts.remove(&id),
            _ => None,
        }
    }

    /// Whether a token is currently registered
    pub fn contains(&self, id: EventId) -> bool {
        !id.is_none() && self.contexts.read().contains_key(&id)
    }

    /// Number of live contexts
    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.contexts.read().is_empty()
    }

    /// Snapshot of every live token
    pub fn ids(&self) -> Vec<EventId> {
        self.contexts.read().keys().copied().collect()
    }

    /// The most recently issued token, or [`EventId::NONE`] before the first `add`
    ///
    /// With a shared counter this is the last token issued by any registry
    /// drawing from it.
    pub fn last_issued(&self) -> EventId {
        EventId::new(self.sequence.counter().load(Ordering::Relaxed))
    }

    /// Remove and return every live context
    ///
    /// The sequence is left untouched so tokens stay unique afterwards.
    pub fn drain(&self) -> Vec<(EventId, C)> {
        self.contexts.write().drain().collect()
    }
}

impl<C: Clone> Default for EventRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for EventRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("live", &self.contexts.read().len())
            .field("sequence", &self.sequence.counter().load(Ordering::Relaxed))
            .finish()
    }
}

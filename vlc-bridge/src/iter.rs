//! Blocking iterator over events forwarded from native threads
//!
//! A subscription moves events off the native callback thread into a
//! channel, so the consumer can do slow work without stalling playback.

use std::time::Duration;

use crossbeam::channel::Receiver;
use vlc_registry::EventId;

use crate::event::Event;
use crate::manager::EventManager;

/// Events of one kind, received on the consumer's thread
///
/// `next()` blocks until an event arrives or the subscription is detached.
/// Dropping the subscription detaches it.
pub struct EventSubscription {
    manager: EventManager,
    id: EventId,
    rx: Receiver<Event>,
}

impl EventSubscription {
    pub(crate) fn new(manager: EventManager, id: EventId, rx: Receiver<Event>) -> Self {
        Self { manager, id, rx }
    }

    /// Registration backing this subscription
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Block until an event is available
    ///
    /// Returns `None` once the registration is gone and the queue is empty.
    pub fn recv(&self) -> Option<Event> {
        self.rx.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Block until an event is available or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Non-blocking iterator over currently queued events
    pub fn try_iter(&self) -> TryIterator<'_> {
        TryIterator { inner: self }
    }

    /// Blocking iterator waiting up to `timeout` for each event
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIterator<'_> {
        TimeoutIterator {
            inner: self,
            timeout,
        }
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Iterator for EventSubscription {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if self.manager.detach([self.id]).is_err() {
            tracing::trace!("Subscription {} dropped after instance release", self.id);
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("id", &self.id)
            .field("queued", &self.rx.len())
            .finish()
    }
}

/// Non-blocking iterator over currently queued events
pub struct TryIterator<'a> {
    inner: &'a EventSubscription,
}

impl<'a> Iterator for TryIterator<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Blocking iterator with timeout
pub struct TimeoutIterator<'a> {
    inner: &'a EventSubscription,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIterator<'a> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}

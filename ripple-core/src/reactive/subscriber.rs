//! Identities and trait seams shared by the reactive primitives.
//!
//! A [`Source`] is anything a computation can depend on (a signal of any
//! value type). A [`Subscriber`] is anything a source can notify (an
//! effect's run-handle). Both sides are type-erased behind these traits so
//! a single dependency list can hold signals of different `T`.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::clock::Revision;

/// Unique identifier for a source (signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a subscriber.
///
/// Each effect gets one at construction. Signals key their subscriber sets
/// by it, which is what makes subscription idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A value that computations can depend on.
pub trait Source {
    fn source_id(&self) -> SourceId;

    /// Revision of the most recent write.
    fn last_changed(&self) -> Revision;

    /// Add `subscriber` to the notification set. Idempotent: a subscriber
    /// that is already present keeps its position.
    fn subscribe(&self, subscriber: Rc<dyn Subscriber>);

    /// Remove a subscriber. No-op if absent.
    fn unsubscribe(&self, id: SubscriberId);
}

/// Something that re-runs when one of its sources is written.
pub trait Subscriber {
    fn subscriber_id(&self) -> SubscriberId;

    /// Called synchronously by a source after each write.
    fn notify(&self);
}

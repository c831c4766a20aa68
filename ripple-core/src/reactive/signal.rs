//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value, the
//! revision of its last write, and the set of effects subscribed to it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read inside a memo body, it is appended to that
//!    memo's dependency list.
//!
//! 2. When a signal is read inside an effect body, it is appended to the
//!    effect's dependency list and the effect's run-handle joins the
//!    signal's subscriber set.
//!
//! 3. When a signal is written, the clock advances, the signal is stamped
//!    with the new revision, and every subscribed effect re-runs
//!    synchronously, in subscription order.
//!
//! Memos never subscribe. They compare `last_changed` against their own
//! last run when they are next read.
//!
//! # Notification Order
//!
//! Subscribers are notified in the order they first subscribed. An effect
//! that re-runs and reads the signal again keeps its original position.
//! The write iterates over a snapshot of the set; a subscriber that is
//! removed before its turn (disposed, or re-run by an earlier subscriber
//! and no longer reading this signal) is skipped.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::clock::{self, Revision};
use super::context::ReactiveContext;
use super::runtime::Runtime;
use super::subscriber::{Source, SourceId, Subscriber, SubscriberId};
use crate::error::Result;

struct SignalNode<T> {
    id: SourceId,
    value: RefCell<T>,
    last_changed: Cell<Revision>,
    subscribers: RefCell<IndexMap<SubscriberId, Rc<dyn Subscriber>>>,
}

impl<T> Source for SignalNode<T> {
    fn source_id(&self) -> SourceId {
        self.id
    }

    fn last_changed(&self) -> Revision {
        self.last_changed.get()
    }

    fn subscribe(&self, subscriber: Rc<dyn Subscriber>) {
        self.subscribers
            .borrow_mut()
            .entry(subscriber.subscriber_id())
            .or_insert(subscriber);
    }

    fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.borrow_mut().shift_remove(&id);
    }
}

/// A reactive cell holding a value of type `T`.
///
/// Cloning a `Signal` yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    node: Rc<SignalNode<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a new signal with the given initial value.
    ///
    /// The signal is stamped with the current revision.
    pub fn new(value: T) -> Self {
        Self {
            node: Rc::new(SignalNode {
                id: SourceId::new(),
                value: RefCell::new(value),
                last_changed: Cell::new(clock::now()),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.node.id
    }

    /// Get a clone of the current value, registering the read with the
    /// active memo and/or effect.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.node.value.borrow().clone()
    }

    /// Read the value by reference, registering the read like [`get`](Self::get).
    ///
    /// # Panics
    ///
    /// Panics if `f` writes to this same signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&*self.node.value.borrow())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.node.value.borrow().clone()
    }

    /// Store a new value and run every subscribed effect.
    ///
    /// # Panics
    ///
    /// Panics if the write would exceed the runtime's propagation depth
    /// limit (see [`try_set`](Self::try_set)), and propagates any panic
    /// raised by a subscribed effect.
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    /// Store a new value and run every subscribed effect.
    ///
    /// Returns [`ReactiveError::PropagationDepthExceeded`] without storing
    /// the value when this write is nested too deeply inside other writes.
    ///
    /// [`ReactiveError::PropagationDepthExceeded`]: crate::ReactiveError::PropagationDepthExceeded
    pub fn try_set(&self, value: T) -> Result<()> {
        let _pass = Runtime::enter_propagation()?;

        *self.node.value.borrow_mut() = value;
        let revision = clock::advance();
        self.node.last_changed.set(revision);
        Runtime::record_write();

        let subscribers: SmallVec<[Rc<dyn Subscriber>; 4]> =
            self.node.subscribers.borrow().values().cloned().collect();
        trace!(
            signal = ?self.node.id,
            %revision,
            subscribers = subscribers.len(),
            "signal written"
        );

        for subscriber in subscribers {
            if self.has_subscriber(subscriber.subscriber_id()) {
                subscriber.notify();
            }
        }
        Ok(())
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&*self.node.value.borrow());
        self.set(next);
    }

    /// Revision of the most recent write (or of creation).
    pub fn last_changed(&self) -> Revision {
        self.node.last_changed.get()
    }

    /// Remove a subscriber. No-op if it is not subscribed.
    pub fn remove_subscriber(&self, id: SubscriberId) {
        self.node.unsubscribe(id);
    }

    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.node.subscribers.borrow().contains_key(&id)
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.node.subscribers.borrow().len()
    }

    /// Subscriber IDs in notification order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.node.subscribers.borrow().keys().copied().collect()
    }

    fn track(&self) {
        let source: Rc<dyn Source> = self.node.clone();
        ReactiveContext::track(&source);
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.node.id)
            .field("value", &*self.node.value.borrow())
            .field("last_changed", &self.last_changed())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Create a signal holding `value`.
pub fn create_signal<T: 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

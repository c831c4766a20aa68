//! Effect Implementation
//!
//! An Effect is a side-effecting computation that re-runs whenever a signal
//! it read during its last run is written.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately inside an
//!    effect frame. Every signal it reads is recorded as a dependency and
//!    gains the effect's run-handle as a subscriber.
//!
//! 2. When any of those signals is written, the signal calls the run-handle
//!    and the effect runs again, synchronously, before the write returns.
//!
//! 3. After every run the subscriptions are reconciled against the reads of
//!    that run: signals that were not read again are unsubscribed from, so
//!    a signal read only under a condition stops triggering the effect once
//!    the condition stops holding.
//!
//! # Cleanup
//!
//! The effect function may return a [`Cleanup`]. It is called before the
//! next run and when the effect is disposed, exactly once either way.
//!
//! # Lifetime
//!
//! A subscribed effect is owned by the signals it depends on, so it stays
//! active after its [`Effect`] handle is dropped. Only [`Effect::dispose`]
//! stops it.
//!
//! # Failure
//!
//! A panic in the effect function propagates to whoever triggered the run:
//! the caller of [`Effect::new`], or the writer of the signal. The write
//! does not notify the subscribers after the failing one. Subscriptions made
//! before the panic are kept, consistent with the recorded dependencies.

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::context::{Dependencies, EffectFrame, EffectGuard, Tracked};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

/// A function run before an effect's next run or at its disposal.
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Box::new(f))
    }

    fn run(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Cleanup")
    }
}

/// Values an effect function may return.
pub trait IntoCleanup {
    fn into_cleanup(self) -> Option<Cleanup>;
}

impl IntoCleanup for () {
    fn into_cleanup(self) -> Option<Cleanup> {
        None
    }
}

impl IntoCleanup for Cleanup {
    fn into_cleanup(self) -> Option<Cleanup> {
        Some(self)
    }
}

impl IntoCleanup for Option<Cleanup> {
    fn into_cleanup(self) -> Option<Cleanup> {
        self
    }
}

/// Lifecycle of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectState {
    Active,
    Disposed,
}

struct EffectInner {
    id: SubscriberId,
    /// Weak self-reference, upgraded into the run-handle given to signals.
    this: Weak<EffectInner>,
    run: Box<dyn Fn() -> Option<Cleanup>>,
    dependencies: RefCell<Dependencies>,
    cleanup: RefCell<Option<Cleanup>>,
    state: Cell<EffectState>,
    run_count: Cell<usize>,
}

impl EffectInner {
    fn is_disposed(&self) -> bool {
        self.state.get() == EffectState::Disposed
    }

    fn execute(&self) {
        if self.is_disposed() {
            return;
        }
        let Some(handle) = self.this.upgrade() else {
            return;
        };

        let previous_cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = previous_cleanup {
            cleanup.run();
        }

        let tracked: Tracked = Rc::new(RefCell::new(Dependencies::new()));
        let reconcile = Reconcile {
            effect: self,
            handle: Rc::clone(&handle) as Rc<dyn Subscriber>,
            tracked: Rc::clone(&tracked),
        };

        let cleanup = {
            let _frame = EffectGuard::enter(EffectFrame::new(tracked, handle));
            (self.run)()
        };

        drop(reconcile);
        self.run_count.set(self.run_count.get() + 1);
        Runtime::record_effect_run();
        trace!(
            effect = ?self.id,
            dependencies = self.dependencies.borrow().len(),
            "effect ran"
        );

        if let Some(cleanup) = cleanup {
            self.store_cleanup(cleanup);
        }
    }

    fn store_cleanup(&self, cleanup: Cleanup) {
        if self.is_disposed() {
            // Disposed from inside its own run; nothing will call it later.
            cleanup.run();
            return;
        }
        // A re-entrant run may have left its own cleanup in the slot.
        let displaced = self.cleanup.borrow_mut().replace(cleanup);
        if let Some(displaced) = displaced {
            displaced.run();
        }
    }

    fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        self.state.set(EffectState::Disposed);

        let cleanup = self.cleanup.borrow_mut().take();
        if let Some(cleanup) = cleanup {
            cleanup.run();
        }

        let dependencies = mem::take(&mut *self.dependencies.borrow_mut());
        for source in dependencies.iter() {
            source.unsubscribe(self.id);
        }
        Runtime::record_effect_disposed();
        debug!(effect = ?self.id, "effect disposed");
    }
}

impl Subscriber for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.id
    }

    fn notify(&self) {
        self.execute();
    }
}

/// Brings the signals' subscriber sets in line with the reads of a run.
///
/// Runs on drop so the subscriptions stay consistent with the recorded
/// dependencies when the effect function panics.
struct Reconcile<'a> {
    effect: &'a EffectInner,
    handle: Rc<dyn Subscriber>,
    tracked: Tracked,
}

impl Drop for Reconcile<'_> {
    fn drop(&mut self) {
        let current = mem::take(&mut *self.tracked.borrow_mut());
        // Whatever is recorded now: the previous run's reads, or those of a
        // re-entrant run that finished while this one was executing.
        let previous = mem::take(&mut *self.effect.dependencies.borrow_mut());

        for source in previous.iter() {
            if !current.contains(source.source_id()) {
                source.unsubscribe(self.effect.id);
            }
        }

        if self.effect.is_disposed() {
            for source in current.iter() {
                source.unsubscribe(self.effect.id);
            }
            return;
        }

        for source in current.iter() {
            source.subscribe(Rc::clone(&self.handle));
        }
        *self.effect.dependencies.borrow_mut() = current;
    }
}

/// A side-effecting computation that runs when its dependencies change.
///
/// Cloning an `Effect` yields another handle to the same effect.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{Effect, Signal};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let count = Signal::new(0);
/// let seen = Rc::new(Cell::new(-1));
///
/// let effect = {
///     let count = count.clone();
///     let seen = seen.clone();
///     Effect::new(move || seen.set(count.get()))
/// };
/// assert_eq!(seen.get(), 0);
///
/// count.set(5); // Effect runs again before `set` returns
/// assert_eq!(seen.get(), 5);
///
/// effect.dispose();
/// count.set(6);
/// assert_eq!(seen.get(), 5);
/// ```
#[must_use = "an effect can only be stopped through its handle"]
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Create a new effect and run it once.
    ///
    /// The function may return `()`, a [`Cleanup`], or an
    /// `Option<Cleanup>`. A panic during this first run propagates to the
    /// caller.
    pub fn new<F, R>(run: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: IntoCleanup,
    {
        let inner = Rc::new_cyclic(|this| EffectInner {
            id: SubscriberId::new(),
            this: this.clone(),
            run: Box::new(move || run().into_cleanup()),
            dependencies: RefCell::new(Dependencies::new()),
            cleanup: RefCell::new(None),
            state: Cell::new(EffectState::Active),
            run_count: Cell::new(0),
        });

        // Run immediately to establish dependencies
        inner.execute();

        Self { inner }
    }

    /// Get the effect's subscriber ID, the key signals store it under.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// Stop the effect.
    ///
    /// Calls the pending cleanup, unsubscribes from every dependency, and
    /// prevents any further run. Disposing twice is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    pub fn state(&self) -> EffectState {
        self.inner.state.get()
    }

    /// Get the number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of signals read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Turn the handle into a plain disposal callback.
    pub fn into_dispose_fn(self) -> impl Fn() {
        move || self.dispose()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// Create an effect and run it once. See [`Effect::new`].
pub fn create_effect<F, R>(run: F) -> Effect
where
    F: Fn() -> R + 'static,
    R: IntoCleanup,
{
    Effect::new(run)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

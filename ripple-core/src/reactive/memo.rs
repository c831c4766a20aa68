//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when one of the
//! signals it read last time has been written since.
//!
//! # How Memos Work
//!
//! 1. On first access, the memo runs its computation inside a computation
//!    frame, records every signal the computation reads, caches the result,
//!    and stamps itself with the current revision (`last_run_at`).
//!
//! 2. On later accesses, it checks whether any recorded dependency has a
//!    `last_changed` revision newer than `last_run_at`. If none has, the
//!    cached value is returned and the computation does not run.
//!
//! 3. Otherwise the dependency list is cleared and the computation runs
//!    again, so the list always reflects the reads of the most recent run.
//!    A signal read only under a condition drops out once the condition
//!    stops holding.
//!
//! Memos are pull-based: they never subscribe to signals and have nothing
//! to dispose. An unreferenced memo is simply dropped.
//!
//! # Nesting
//!
//! When a memo is read inside another memo or an effect, its own
//! dependencies are forwarded to the surrounding frames. The outer
//! computation thus depends on the signals underneath the memo, and a cached
//! read inside an effect keeps that effect subscribed.
//!
//! # Failure
//!
//! If the computation panics, the panic propagates to the caller. The cache
//! and `last_run_at` keep their previous values, the tracking context is
//! restored, and the dependency list holds whatever was read before the
//! panic.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::clock::{self, Revision};
use super::context::{ComputationFrame, ComputationGuard, Dependencies, ReactiveContext, Tracked};
use super::runtime::Runtime;

/// Counter for generating unique memo IDs.
static MEMO_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique memo ID.
fn next_memo_id() -> u64 {
    MEMO_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Freshness of a memo's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoState {
    /// The computation has never completed.
    Unevaluated,

    /// No dependency changed since the last run; reads hit the cache.
    Fresh,

    /// A dependency was written since the last run.
    Stale,
}

struct MemoInner<T> {
    id: u64,
    compute: Box<dyn Fn() -> T>,
    /// `Some` once the computation has completed at least once.
    value: RefCell<Option<T>>,
    last_run_at: Cell<Revision>,
    /// Sources read during the most recent run. Shared with the frame while
    /// the computation executes.
    dependencies: Tracked,
    recompute_count: Cell<usize>,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{Memo, Signal};
///
/// let count = Signal::new(0);
/// let doubled = {
///     let count = count.clone();
///     Memo::new(move || count.get() * 2)
/// };
///
/// assert_eq!(doubled.get(), 0);
/// count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T: 'static> {
    inner: Rc<MemoInner<T>>,
}

impl<T: Clone + 'static> Memo<T> {
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first access.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        Self {
            inner: Rc::new(MemoInner {
                id: next_memo_id(),
                compute: Box::new(compute),
                value: RefCell::new(None),
                last_run_at: Cell::new(Revision::ZERO),
                dependencies: Rc::new(RefCell::new(Dependencies::new())),
                recompute_count: Cell::new(0),
            }),
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value, recomputing if a dependency changed.
    ///
    /// This is the main entry point for reading a memo's value.
    pub fn get(&self) -> T {
        let value = match self.cached() {
            Some(value) => value,
            None => self.recompute(),
        };
        self.forward_dependencies();
        value
    }

    /// Get the current freshness state.
    pub fn state(&self) -> MemoState {
        if self.inner.value.borrow().is_none() {
            MemoState::Unevaluated
        } else if self.is_stale() {
            MemoState::Stale
        } else {
            MemoState::Fresh
        }
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.inner.value.borrow().is_some()
    }

    /// Revision at the end of the last completed run, or zero.
    pub fn last_run_at(&self) -> Revision {
        self.inner.last_run_at.get()
    }

    /// Number of sources read during the most recent run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// Number of times the computation has completed.
    pub fn recompute_count(&self) -> usize {
        self.inner.recompute_count.get()
    }

    fn is_stale(&self) -> bool {
        self.inner
            .dependencies
            .borrow()
            .changed_since(self.inner.last_run_at.get())
    }

    fn cached(&self) -> Option<T> {
        if self.is_stale() {
            return None;
        }
        self.inner.value.borrow().clone()
    }

    /// Run the computation within a fresh computation frame.
    fn recompute(&self) -> T {
        self.inner.dependencies.borrow_mut().clear();

        let value = {
            let _frame =
                ComputationGuard::enter(ComputationFrame::new(Rc::clone(&self.inner.dependencies)));
            (self.inner.compute)()
        };

        let revision = clock::now();
        self.inner.last_run_at.set(revision);
        *self.inner.value.borrow_mut() = Some(value.clone());
        self.inner
            .recompute_count
            .set(self.inner.recompute_count.get() + 1);
        Runtime::record_memo_recompute();

        trace!(
            memo = self.inner.id,
            %revision,
            dependencies = self.dependency_count(),
            "memo recomputed"
        );
        value
    }

    /// Hand our dependencies to whatever frame is reading this memo.
    fn forward_dependencies(&self) {
        if !ReactiveContext::is_tracking() {
            return;
        }
        let sources = self.inner.dependencies.borrow().snapshot();
        for source in &sources {
            ReactiveContext::track(source);
        }
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("last_run_at", &self.last_run_at())
            .field("dependency_count", &self.dependency_count())
            .finish()
    }
}

/// Create a memo over `compute`. Call [`Memo::get`] to evaluate it.
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Memo::new(compute)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use crate::reactive::Signal;

    fn counted<T: Clone + 'static>(f: impl Fn() -> T + 'static) -> (Memo<T>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let probe = calls.clone();
        let memo = Memo::new(move || {
            probe.set(probe.get() + 1);
            f()
        });
        (memo, calls)
    }

    #[test]
    fn memo_computes_on_first_access() {
        let (memo, calls) = counted(|| 42);

        // Not computed yet
        assert!(!memo.has_value());
        assert_eq!(memo.state(), MemoState::Unevaluated);
        assert_eq!(calls.get(), 0);

        // First access triggers computation
        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
        assert!(memo.has_value());
        assert_eq!(memo.state(), MemoState::Fresh);
    }

    #[test]
    fn memo_caches_value_when_fresh() {
        let (memo, calls) = counted(|| 42);

        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(memo.get(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn memo_recomputes_after_dependency_write() {
        let signal = Signal::new(1);
        let source = signal.clone();
        let (memo, calls) = counted(move || source.get() * 2);

        assert_eq!(memo.get(), 2);
        signal.set(5);
        assert_eq!(memo.state(), MemoState::Stale);
        assert_eq!(memo.get(), 10);
        assert_eq!(calls.get(), 2);
        assert_eq!(memo.recompute_count(), 2);
    }

    #[test]
    fn unrelated_write_does_not_recompute() {
        let signal = Signal::new(1);
        let other = Signal::new(0);
        let source = signal.clone();
        let (memo, calls) = counted(move || source.get());

        memo.get();
        other.set(9);
        memo.get();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn none_results_are_memoized() {
        let (memo, calls) = counted(|| Option::<i32>::None);

        assert_eq!(memo.get(), None);
        assert_eq!(memo.get(), None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn last_run_at_tracks_clock() {
        let signal = Signal::new(0);
        let source = signal.clone();
        let memo = Memo::new(move || source.get());

        assert_eq!(memo.last_run_at(), Revision::ZERO);
        signal.set(3);
        memo.get();
        assert_eq!(memo.last_run_at(), signal.last_changed());
    }

    #[test]
    fn dependencies_are_deduplicated() {
        let signal = Signal::new(2);
        let source = signal.clone();
        let memo = Memo::new(move || source.get() + source.get());

        assert_eq!(memo.get(), 4);
        assert_eq!(memo.dependency_count(), 1);
    }

    #[test]
    fn panicking_body_keeps_previous_cache() {
        let signal = Signal::new(1);
        let source = signal.clone();
        let memo = Memo::new(move || {
            let v = source.get();
            assert!(v < 10, "value too large");
            v
        });

        assert_eq!(memo.get(), 1);
        let ran_at = memo.last_run_at();

        signal.set(20);
        let result = catch_unwind(AssertUnwindSafe(|| memo.get()));
        assert!(result.is_err());

        // The tracking context is restored and nothing was cached
        assert!(!ReactiveContext::is_tracking());
        assert_eq!(memo.last_run_at(), ran_at);
        assert_eq!(memo.dependency_count(), 1);

        signal.set(3);
        assert_eq!(memo.get(), 3);
    }

    #[test]
    fn memo_clone_shares_state() {
        let memo1 = Memo::new(|| 42);

        // Force computation
        assert_eq!(memo1.get(), 42);

        let memo2 = memo1.clone();

        // Clone should have same ID and share state
        assert_eq!(memo1.id(), memo2.id());
        assert!(memo2.has_value());
        assert_eq!(memo2.get(), 42);
        assert_eq!(memo2.recompute_count(), 1);
    }

    #[test]
    fn nested_memo_forwards_dependencies() {
        let base = Signal::new(5);
        let source = base.clone();
        let doubled = Memo::new(move || source.get() * 2);
        let inner = doubled.clone();
        let (plus_ten, outer_calls) = counted(move || inner.get() + 10);

        assert_eq!(plus_ten.get(), 20);
        assert_eq!(plus_ten.dependency_count(), 1);

        base.set(10);
        assert_eq!(plus_ten.get(), 30);
        assert_eq!(outer_calls.get(), 2);

        // Fresh inner memo read from cache still forwards
        assert_eq!(plus_ten.get(), 30);
        assert_eq!(outer_calls.get(), 2);
    }

    #[test]
    fn recomputes_are_counted() {
        let before = Runtime::stats().memo_recomputes;
        let memo = create_memo(|| 1);
        memo.get();
        memo.get();
        assert_eq!(Runtime::stats().memo_recomputes, before + 1);
    }
}

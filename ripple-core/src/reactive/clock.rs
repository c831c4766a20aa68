//! Revision Clock
//!
//! The clock is a single counter that timestamps every signal write. It is
//! what makes staleness checks cheap: a memo only has to compare the
//! `last_changed` revision of each dependency against its own `last_run_at`
//! revision, rather than re-running its computation.
//!
//! # Scope
//!
//! Reactive handles are `!Send`, so a reactive graph can never span threads.
//! The clock is therefore kept per thread, next to the tracking context,
//! which keeps every runtime on its own timeline without synchronization.

use std::cell::Cell;
use std::fmt;

thread_local! {
    static CURRENT_REVISION: Cell<u64> = const { Cell::new(0) };
}

/// A point on the mutation timeline.
///
/// Revision `0` is the state of the world before any write. Every completed
/// signal write advances the clock by exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Revision(u64);

impl Revision {
    /// The revision before any write, also used as "never ran".
    pub const ZERO: Revision = Revision(0);

    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Returns the current revision.
pub fn now() -> Revision {
    Revision(CURRENT_REVISION.with(Cell::get))
}

/// Advances the clock and returns the new revision.
///
/// Called exactly once per signal write, after the value is stored and
/// before subscribers are notified.
pub fn advance() -> Revision {
    CURRENT_REVISION.with(|revision| {
        let next = revision.get() + 1;
        revision.set(next);
        Revision(next)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_zero() {
        let fresh = std::thread::spawn(now).join().unwrap();
        assert_eq!(fresh, Revision::ZERO);
    }

    #[test]
    fn advance_is_monotonic() {
        let start = now();
        let first = advance();
        let second = advance();

        assert!(first > start);
        assert_eq!(second.get(), first.get() + 1);
        assert_eq!(now(), second);
    }

    #[test]
    fn now_has_no_side_effects() {
        let a = now();
        let b = now();
        assert_eq!(a, b);
    }

    #[test]
    fn clocks_are_per_thread() {
        advance();
        advance();
        let other = std::thread::spawn(now).join().unwrap();
        assert_eq!(other, Revision::ZERO);
    }

    #[test]
    fn revision_display() {
        assert_eq!(Revision(12).to_string(), "r12");
    }
}

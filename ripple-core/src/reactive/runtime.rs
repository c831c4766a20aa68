//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator behind signals, memos, and
//! effects. The primitives themselves own the dependency graph (signals
//! hold their subscribers, memos and effects hold their dependencies), so
//! the runtime only keeps what is genuinely global:
//!
//! - the configuration (currently the propagation depth limit),
//! - the depth of nested write propagation, used as a cycle guard,
//! - counters for writes, memo recomputes, effect runs, and disposals.
//!
//! # Propagation Depth
//!
//! Writes propagate synchronously: a write runs its subscribed effects,
//! which may write other signals, which run their effects, and so on. Each
//! nested write is one level deeper. An effect that writes a signal it
//! depends on re-triggers itself and would recurse until the stack
//! overflows, so the runtime refuses writes beyond
//! [`RuntimeConfig::max_propagation_depth`] with
//! [`ReactiveError::PropagationDepthExceeded`].

use std::cell::Cell;

use tracing::{debug, warn};

use super::clock::{self, Revision};
use super::context::ReactiveContext;
use crate::error::{ReactiveError, Result};

/// Default limit on nested write propagation.
pub const DEFAULT_MAX_PROPAGATION_DEPTH: usize = 64;

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Maximum number of write propagation passes that may be nested inside
    /// each other before a write is rejected.
    pub max_propagation_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_propagation_depth: DEFAULT_MAX_PROPAGATION_DEPTH,
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_propagation_depth(mut self, depth: usize) -> Self {
        self.max_propagation_depth = depth;
        self
    }

    /// Check the configuration for values the runtime cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_propagation_depth == 0 {
            return Err(ReactiveError::InvalidConfig(
                "max_propagation_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters describing the work done on this thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub writes: u64,
    pub memo_recomputes: u64,
    pub effect_runs: u64,
    pub effects_disposed: u64,
}

thread_local! {
    static CONFIG: Cell<RuntimeConfig> = const {
        Cell::new(RuntimeConfig {
            max_propagation_depth: DEFAULT_MAX_PROPAGATION_DEPTH,
        })
    };
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static STATS: Cell<RuntimeStats> = const {
        Cell::new(RuntimeStats {
            writes: 0,
            memo_recomputes: 0,
            effect_runs: 0,
            effects_disposed: 0,
        })
    };
}

fn record(update: impl FnOnce(&mut RuntimeStats)) {
    STATS.with(|stats| {
        let mut current = stats.get();
        update(&mut current);
        stats.set(current);
    });
}

/// Marks one active propagation pass; leaves it when dropped.
pub(crate) struct PropagationGuard {
    _private: (),
}

impl Drop for PropagationGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Replace the configuration for this thread.
    pub fn configure(config: RuntimeConfig) -> Result<()> {
        config.validate()?;
        CONFIG.with(|current| current.set(config));
        debug!(
            max_propagation_depth = config.max_propagation_depth,
            "runtime configured"
        );
        Ok(())
    }

    /// The active configuration.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(Cell::get)
    }

    /// The current revision of the clock.
    pub fn revision() -> Revision {
        clock::now()
    }

    /// Number of write propagation passes currently in progress.
    pub fn propagation_depth() -> usize {
        DEPTH.with(Cell::get)
    }

    /// Check if we're inside a memo or effect body.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_tracking()
    }

    pub fn stats() -> RuntimeStats {
        STATS.with(Cell::get)
    }

    pub fn reset_stats() {
        STATS.with(|stats| stats.set(RuntimeStats::default()));
    }

    /// Start a propagation pass for one write.
    ///
    /// Fails without side effects when the pass would exceed the configured
    /// depth.
    pub(crate) fn enter_propagation() -> Result<PropagationGuard> {
        let limit = Self::config().max_propagation_depth;
        let depth = Self::propagation_depth();
        if depth >= limit {
            warn!(limit, "propagation depth limit exceeded, rejecting write");
            return Err(ReactiveError::PropagationDepthExceeded { limit });
        }
        DEPTH.with(|current| current.set(depth + 1));
        Ok(PropagationGuard { _private: () })
    }

    pub(crate) fn record_write() {
        record(|stats| stats.writes += 1);
    }

    pub(crate) fn record_memo_recompute() {
        record(|stats| stats.memo_recomputes += 1);
    }

    pub(crate) fn record_effect_run() {
        record(|stats| stats.effect_runs += 1);
    }

    pub(crate) fn record_effect_disposed() {
        record(|stats| stats.effects_disposed += 1);
    }
}

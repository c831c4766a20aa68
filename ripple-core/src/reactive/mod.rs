//! Reactive Primitives
//!
//! This module implements the reactive system: signals, memos, and effects,
//! coordinated by a revision clock and a tracking context.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. Every write advances the
//! revision clock and stamps the signal with the new revision. Reading a
//! signal inside a memo or effect registers it as a dependency.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It is pull-based: when
//! read, it compares the revisions of the signals it read last time against
//! the revision of its own last run, and only re-runs on a mismatch.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once on creation and
//! again, synchronously, whenever one of the signals it read last time is
//! written. Effects subscribe to their signals and stay active until
//! disposed.
//!
//! # Implementation Notes
//!
//! Dependencies are captured implicitly through a thread-local tracking
//! context. When a signal is read, it checks the active frames and
//! registers itself. All runtime state lives in thread-locals and every
//! handle is `!Send`, so a reactive graph is confined to one thread.

pub mod clock;
mod context;
mod effect;
mod memo;
mod runtime;
mod signal;
mod subscriber;

pub use clock::Revision;
pub use context::{
    enter_computation_frame, enter_effect_frame, exit_computation_frame, exit_effect_frame,
    ComputationFrame, ComputationGuard, Dependencies, EffectFrame, EffectGuard, ReactiveContext,
    Tracked,
};
pub use effect::{create_effect, Cleanup, Effect, EffectState, IntoCleanup};
pub use memo::{create_memo, Memo, MemoState};
pub use runtime::{Runtime, RuntimeConfig, RuntimeStats, DEFAULT_MAX_PROPAGATION_DEPTH};
pub use signal::{create_signal, Signal};
pub use subscriber::{Source, SourceId, Subscriber, SubscriberId};

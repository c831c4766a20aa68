//! Ripple Core
//!
//! A fine-grained reactive state runtime. It provides three primitives
//! that track their dependencies automatically:
//!
//! - [`Signal`]: a mutable observable cell
//! - [`Memo`]: a derived value, recomputed only when a dependency changed
//! - [`Effect`]: a side effect, re-run whenever a dependency is written
//!
//! No dependency graph is ever declared. Reads performed while a memo or
//! effect is evaluating are recorded, and the recorded set is rebuilt on
//! every run, so conditional reads are handled naturally.
//!
//! # Architecture
//!
//! - `reactive::clock`: the revision counter that timestamps writes
//! - `reactive::context`: the frames recording reads during evaluation
//! - `reactive::signal`, `reactive::memo`, `reactive::effect`: the primitives
//! - `reactive::runtime`: configuration, the propagation depth guard, counters
//! - `error`: the runtime's own error type
//!
//! Everything is single-threaded and synchronous: a write returns only after
//! every effect it triggered (and every write those effects made) has run.
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{create_effect, create_memo, create_signal};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let count = create_signal(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     create_memo(move || count.get() * 2)
//! };
//!
//! // Create an effect
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let effect = {
//!     let (count, doubled, log) = (count.clone(), doubled.clone(), log.clone());
//!     create_effect(move || {
//!         log.borrow_mut().push(format!("Count: {}, Doubled: {}", count.get(), doubled.get()));
//!     })
//! };
//!
//! // Update the signal; the effect runs before `set` returns
//! count.set(5);
//! assert_eq!(log.borrow().last().unwrap(), "Count: 5, Doubled: 10");
//!
//! effect.dispose();
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
pub use reactive::{
    create_effect, create_memo, create_signal, Cleanup, Effect, Memo, Revision, Runtime,
    RuntimeConfig, Signal,
};

//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! it can register itself with whatever is evaluating.
//!
//! # Implementation
//!
//! There are two independent thread-local slots: the active *computation*
//! frame (a memo body) and the active *effect* frame (an effect body). They
//! are independent so that an effect body that evaluates a memo is tracked
//! by both at once.
//!
//! Entering a frame swaps the new frame into its slot and hands back the
//! previous occupant; exiting puts the previous occupant back. The guards
//! ([`ComputationGuard`], [`EffectGuard`]) do the exit in `Drop`, so the
//! slots are restored even if the body panics. A leaked frame would
//! misattribute every later read on this thread.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::clock::Revision;
use super::subscriber::{Source, SourceId, Subscriber};

thread_local! {
    static COMPUTATION_FRAME: RefCell<Option<ComputationFrame>> = const { RefCell::new(None) };
    static EFFECT_FRAME: RefCell<Option<EffectFrame>> = const { RefCell::new(None) };
}

/// Ordered, de-duplicated list of sources read during one evaluation.
#[derive(Default, Clone)]
pub struct Dependencies {
    sources: IndexMap<SourceId, Rc<dyn Source>>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read. Repeated reads of the same source are collapsed.
    pub fn insert(&mut self, source: Rc<dyn Source>) {
        self.sources.entry(source.source_id()).or_insert(source);
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.sources.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
    }

    /// Sources in first-read order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn Source>> {
        self.sources.values()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.keys().copied().collect()
    }

    /// True if any source was written after `revision`.
    pub fn changed_since(&self, revision: Revision) -> bool {
        self.sources
            .values()
            .any(|source| source.last_changed() > revision)
    }

    /// Snapshot of the sources, detached from any borrow of `self`.
    pub(crate) fn snapshot(&self) -> SmallVec<[Rc<dyn Source>; 8]> {
        self.sources.values().cloned().collect()
    }
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sources.keys()).finish()
    }
}

/// Shared handle to the accumulator a frame records into.
pub type Tracked = Rc<RefCell<Dependencies>>;

/// The frame of a memo body under evaluation.
#[derive(Clone)]
pub struct ComputationFrame {
    dependencies: Tracked,
}

impl ComputationFrame {
    pub fn new(dependencies: Tracked) -> Self {
        Self { dependencies }
    }
}

/// The frame of an effect body under evaluation.
#[derive(Clone)]
pub struct EffectFrame {
    dependencies: Tracked,
    /// Run-handle that signals add to their subscriber sets.
    handle: Rc<dyn Subscriber>,
}

impl EffectFrame {
    pub fn new(dependencies: Tracked, handle: Rc<dyn Subscriber>) -> Self {
        Self {
            dependencies,
            handle,
        }
    }
}

/// Install `frame` as the active computation frame and return the previous
/// occupant, to be handed back to [`exit_computation_frame`].
pub fn enter_computation_frame(frame: ComputationFrame) -> Option<ComputationFrame> {
    COMPUTATION_FRAME.with(|slot| slot.borrow_mut().replace(frame))
}

/// Restore the computation frame that was active before the matching enter.
pub fn exit_computation_frame(previous: Option<ComputationFrame>) {
    COMPUTATION_FRAME.with(|slot| *slot.borrow_mut() = previous);
}

/// Install `frame` as the active effect frame and return the previous one.
pub fn enter_effect_frame(frame: EffectFrame) -> Option<EffectFrame> {
    EFFECT_FRAME.with(|slot| slot.borrow_mut().replace(frame))
}

/// Restore the effect frame that was active before the matching enter.
pub fn exit_effect_frame(previous: Option<EffectFrame>) {
    EFFECT_FRAME.with(|slot| *slot.borrow_mut() = previous);
}

/// Keeps a computation frame active until dropped.
#[must_use = "the frame is exited as soon as the guard is dropped"]
pub struct ComputationGuard {
    previous: Option<ComputationFrame>,
}

impl ComputationGuard {
    pub fn enter(frame: ComputationFrame) -> Self {
        Self {
            previous: enter_computation_frame(frame),
        }
    }
}

impl Drop for ComputationGuard {
    fn drop(&mut self) {
        exit_computation_frame(self.previous.take());
    }
}

/// Keeps an effect frame active until dropped.
#[must_use = "the frame is exited as soon as the guard is dropped"]
pub struct EffectGuard {
    previous: Option<EffectFrame>,
}

impl EffectGuard {
    pub fn enter(frame: EffectFrame) -> Self {
        Self {
            previous: enter_effect_frame(frame),
        }
    }
}

impl Drop for EffectGuard {
    fn drop(&mut self) {
        exit_effect_frame(self.previous.take());
    }
}

/// Entry points used by the primitives and by callers who need to step
/// outside of tracking.
pub struct ReactiveContext;

impl ReactiveContext {
    /// Check whether a memo or effect body is currently evaluating.
    pub fn is_tracking() -> bool {
        let computing = COMPUTATION_FRAME.with(|slot| slot.borrow().is_some());
        computing || EFFECT_FRAME.with(|slot| slot.borrow().is_some())
    }

    /// Record a read of `source` in the active frames.
    ///
    /// The computation frame only records the dependency. The effect frame
    /// records it and subscribes the effect's run-handle to the source.
    pub fn track(source: &Rc<dyn Source>) {
        COMPUTATION_FRAME.with(|slot| {
            if let Some(frame) = slot.borrow().as_ref() {
                frame.dependencies.borrow_mut().insert(Rc::clone(source));
            }
        });

        // Clone the frame out so the slot is not borrowed while the source
        // updates its subscriber set.
        let effect = EFFECT_FRAME.with(|slot| slot.borrow().clone());
        if let Some(frame) = effect {
            frame.dependencies.borrow_mut().insert(Rc::clone(source));
            source.subscribe(Rc::clone(&frame.handle));
        }
    }

    /// Run `f` with both slots empty, so nothing it reads is tracked.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _computation = ComputationGuard {
            previous: COMPUTATION_FRAME.with(|slot| slot.borrow_mut().take()),
        };
        let _effect = EffectGuard {
            previous: EFFECT_FRAME.with(|slot| slot.borrow_mut().take()),
        };
        f()
    }
}

//! Property tests for memo freshness and effect run counts over random
//! write sequences.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use ripple_core::reactive::{Effect, Memo, Signal};

#[derive(Debug, Clone)]
enum Op {
    /// Write `value` to signal `index`.
    Write { index: usize, value: i64 },
    /// Evaluate the memo.
    Read,
}

fn op_strategy(signals: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..signals, -50i64..50).prop_map(|(index, value)| Op::Write { index, value }),
        Just(Op::Read),
    ]
}

proptest! {
    /// The memo re-runs its body exactly when a signal it read last time was
    /// written since, and always agrees with a fresh evaluation.
    #[test]
    fn memo_matches_fresh_evaluation(ops in prop::collection::vec(op_strategy(3), 1..60)) {
        // signals[0] selects between signals[1] and signals[2]
        let signals: Vec<Signal<i64>> = (0..3).map(|_| Signal::new(0)).collect();
        let calls = Rc::new(Cell::new(0usize));

        let (sources, counter) = (signals.clone(), calls.clone());
        let memo = Memo::new(move || {
            counter.set(counter.get() + 1);
            if sources[0].get() >= 0 {
                sources[1].get() * 2
            } else {
                sources[2].get() - 1
            }
        });
        let fresh = |s: &[Signal<i64>]| {
            if s[0].get_untracked() >= 0 {
                s[1].get_untracked() * 2
            } else {
                s[2].get_untracked() - 1
            }
        };

        prop_assert_eq!(memo.get(), fresh(&signals));
        let mut dirty = false;

        for op in ops {
            match op {
                Op::Write { index, value } => {
                    let selector = signals[0].get_untracked();
                    let read = index == 0
                        || (index == 1 && selector >= 0)
                        || (index == 2 && selector < 0);
                    signals[index].set(value);
                    dirty |= read;
                }
                Op::Read => {
                    let before = calls.get();
                    prop_assert_eq!(memo.get(), fresh(&signals));
                    let expected = if dirty { before + 1 } else { before };
                    prop_assert_eq!(calls.get(), expected);
                    dirty = false;
                }
            }
        }
    }

    /// An effect runs once on creation and once per write to a signal it
    /// read during its latest run.
    #[test]
    fn effect_runs_once_per_relevant_write(ops in prop::collection::vec(op_strategy(3), 1..60)) {
        let signals: Vec<Signal<i64>> = (0..3).map(|_| Signal::new(0)).collect();
        let runs = Rc::new(Cell::new(0usize));

        let (sources, counter) = (signals.clone(), runs.clone());
        let effect = Effect::new(move || {
            counter.set(counter.get() + 1);
            if sources[0].get() % 2 == 0 {
                sources[1].get();
            } else {
                sources[2].get();
            }
        });

        let mut expected = 1;
        prop_assert_eq!(runs.get(), expected);

        for op in ops {
            if let Op::Write { index, value } = op {
                let selector = signals[0].get_untracked();
                let read = index == 0
                    || (index == 1 && selector % 2 == 0)
                    || (index == 2 && selector % 2 != 0);
                signals[index].set(value);
                if read {
                    expected += 1;
                }
                prop_assert_eq!(runs.get(), expected);
            }
        }

        effect.dispose();
        for signal in &signals {
            signal.set(1);
            prop_assert_eq!(signal.subscriber_count(), 0);
        }
        prop_assert_eq!(runs.get(), expected);
    }
}

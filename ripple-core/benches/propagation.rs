//! Benchmarks for write propagation and memo evaluation.

use std::cell::Cell;
use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ripple_core::reactive::{Effect, Memo, Signal};

fn write_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fan_out");
    for subscribers in [1usize, 16, 256] {
        let signal = Signal::new(0u64);
        let total = Rc::new(Cell::new(0u64));
        let effects: Vec<Effect> = (0..subscribers)
            .map(|_| {
                let (source, total) = (signal.clone(), total.clone());
                Effect::new(move || total.set(total.get().wrapping_add(source.get())))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                let mut next = 0u64;
                b.iter(|| {
                    next += 1;
                    signal.set(black_box(next));
                });
            },
        );

        for effect in &effects {
            effect.dispose();
        }
    }
    group.finish();
}

fn memo_reads(c: &mut Criterion) {
    let signals: Vec<Signal<u64>> = (0..32).map(Signal::new).collect();
    let sources = signals.clone();
    let sum = Memo::new(move || sources.iter().map(Signal::get).sum::<u64>());

    c.bench_function("memo_cached_read", |b| {
        b.iter(|| black_box(sum.get()));
    });

    c.bench_function("memo_stale_read", |b| {
        let mut next = 0u64;
        b.iter(|| {
            next += 1;
            signals[0].set(next);
            black_box(sum.get())
        });
    });
}

fn memo_chain(c: &mut Criterion) {
    let base = Signal::new(1u64);
    let mut tip = {
        let base = base.clone();
        Memo::new(move || base.get())
    };
    for _ in 0..16 {
        let prev = tip.clone();
        tip = Memo::new(move || prev.get() + 1);
    }

    c.bench_function("memo_chain_16", |b| {
        let mut next = 0u64;
        b.iter(|| {
            next += 1;
            base.set(next);
            black_box(tip.get())
        });
    });
}

criterion_group!(benches, write_fan_out, memo_reads, memo_chain);
criterion_main!(benches);

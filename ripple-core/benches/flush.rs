//! Benchmarks for batched watcher flushes.
//!
//! Run with: cargo bench -p ripple-core

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use ripple_core::observer::{observe, Object, Value};
use ripple_core::reactive::{WatchSource, Watcher, WatcherOptions};
use ripple_core::scheduler::tick;
use std::hint::black_box;

/// Observed data with `n` numeric keys and one watcher per key.
fn setup(n: usize) -> (Object, Vec<Watcher>) {
    let data: Object = (0..n).map(|i| (format!("k{i}"), Value::from(i))).collect();
    let root = Value::from(data.clone());
    observe(&root);

    let watchers = (0..n)
        .map(|i| {
            Watcher::with_callback(
                root.clone(),
                format!("k{i}"),
                |new: &Value, _: &Value| {
                    black_box(new);
                    Ok(())
                },
                WatcherOptions::default(),
            )
        })
        .collect();
    (data, watchers)
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler/flush");

    for n in [10, 100, 1000] {
        let (data, _watchers) = setup(n);
        let keys: Vec<String> = (0..n).map(|i| format!("k{i}")).collect();
        let mut round = 0.0;
        group.bench_with_input(BenchmarkId::new("one_write_per_key", n), &keys, |b, keys| {
            b.iter(|| {
                round += 1.0;
                for key in keys {
                    data.set(key, Value::from(round));
                }
                black_box(tick::run_until_idle())
            })
        });
    }

    group.finish();
}

fn bench_batched_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduler/batched_writes");

    for writes in [1, 10, 100] {
        let data: Object = [("n", Value::from(0))].into_iter().collect();
        let root = Value::from(data.clone());
        observe(&root);
        let _watcher = Watcher::new(
            root,
            WatchSource::getter(|ctx: &Value| {
                Ok(ctx.as_object().and_then(|o| o.get("n")).unwrap_or_default())
            }),
            WatcherOptions::default(),
        );

        let mut next = 0.0;
        group.bench_with_input(BenchmarkId::new("same_key", writes), &writes, |b, &writes| {
            b.iter(|| {
                for _ in 0..writes {
                    next += 1.0;
                    data.set("n", Value::from(next));
                }
                black_box(tick::run_until_idle())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flush, bench_batched_writes);
criterion_main!(benches);

//! Throughput Benchmark for linekv
//!
//! Measures the store and the request path under a few workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use linekv::{CommandHandler, KeyValueStore, MissingKeyPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark set operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(KeyValueStore::new("snapshot.json"));

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("key:{}", i), "small_value");
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = "x".repeat(64 * 1024); // 64KB value
        b.iter(|| {
            store.set(format!("key:{}", i), value.clone());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark get operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(KeyValueStore::new("snapshot.json"));

    for i in 0..100_000 {
        store.set(format!("key:{}", i), format!("value:{}", i));
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)).ok());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark the full line path: decode, dispatch, store (80% reads, 20% writes)
fn bench_request_lines(c: &mut Criterion) {
    let store = Arc::new(KeyValueStore::new("snapshot.json"));
    for i in 0..10_000 {
        store.set(format!("key:{}", i), "value");
    }
    let handler = CommandHandler::new(Arc::clone(&store), MissingKeyPolicy::KeepOpen);

    let mut group = c.benchmark_group("request");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let line = if i % 5 == 0 {
                format!("set new:{} value", i)
            } else {
                format!("get key:{}", i % 10_000)
            };
            black_box(handler.handle_line(&line));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(KeyValueStore::new("snapshot.json"));
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.set(key.clone(), "value");
                            let _ = store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_request_lines,
    bench_concurrent,
);

criterion_main!(benches);

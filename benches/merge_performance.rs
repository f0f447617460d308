//! Performance benchmarks for configr.
//!
//! - Deep merge cost as layer count and document width grow
//! - Lock-free snapshot reads, single-threaded and concurrent
//! - Dotted-path lookup

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use configr::core::{deep_merge_all, lookup};
use configr::prelude::*;
use serde_json::{Map, Value, json};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// A layer with `width` top-level sections, each holding a few nested keys.
fn layer(index: usize, width: usize) -> Value {
    let mut root = Map::new();
    for section in 0..width {
        let mut body = json!({
            "enabled": index % 2 == 0,
            "limits": {"max": index * 10, "min": index},
            "tags": [format!("layer{}", index)],
        });
        body[format!("only{}", index)] = json!(true);
        root.insert(format!("section{}", section), body);
    }
    Value::Object(root)
}

fn aggregator(runtime: &tokio::runtime::Runtime, width: usize) -> Aggregator {
    let modules = (0..4).fold(ModuleRegistry::new(), |modules, index| {
        modules.with_fn(format!("layer{}", index), move |_| Ok(layer(index, width)))
    });
    runtime
        .block_on(
            Aggregator::builder()
                .with_env(Env::default())
                .with_baseline(Baseline::Empty)
                .with_modules(modules)
                .with_sources((0..4).map(|i| SourceDescriptor::module(format!("layer{}", i))))
                .build(),
        )
        .unwrap()
}

/// Benchmark merging layers of varying count and width
fn benchmark_deep_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_merge");

    for (layers, width) in [(2, 10), (8, 10), (8, 100), (32, 100)] {
        let values: Vec<Value> = (0..layers).map(|i| layer(i, width)).collect();
        group.throughput(Throughput::Elements(layers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", layers, width)),
            &values,
            |b, values| {
                b.iter(|| black_box(deep_merge_all(values.iter().cloned())));
            },
        );
    }

    group.finish();
}

/// Benchmark single-threaded snapshot reads and path lookups
fn benchmark_read_latency(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let aggregator = aggregator(&runtime, 10);

    let mut group = c.benchmark_group("read_latency");
    group.bench_function("config_snapshot", |b| {
        b.iter(|| {
            let config = aggregator.config();
            black_box(&config);
        });
    });
    group.bench_function("get_path", |b| {
        b.iter(|| black_box(aggregator.get("section5.limits.max")));
    });
    let config = aggregator.config();
    group.bench_function("lookup_borrowed", |b| {
        b.iter(|| black_box(lookup(&config, "section5.limits.max")));
    });
    group.finish();
}

/// Benchmark concurrent snapshot reads with varying thread counts
fn benchmark_concurrent_reads(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_reads");

    for num_threads in [1, 2, 4, 8, 16] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_threads", num_threads)),
            &num_threads,
            |b, &num_threads| {
                let shared = Arc::new(aggregator(&runtime, 10));
                let barrier = Arc::new(Barrier::new(num_threads + 1));

                b.iter_custom(|iters| {
                    let mut handles = vec![];
                    let start_barrier = Arc::clone(&barrier);

                    for _ in 0..num_threads {
                        let agg = Arc::clone(&shared);
                        let b = Arc::clone(&barrier);

                        handles.push(thread::spawn(move || {
                            b.wait();

                            let start = std::time::Instant::now();
                            for _ in 0..iters {
                                let config = agg.config();
                                black_box(&config["section0"]);
                            }
                            start.elapsed()
                        }));
                    }

                    start_barrier.wait();

                    let total_duration: Duration =
                        handles.into_iter().map(|h| h.join().unwrap()).sum();
                    total_duration / num_threads as u32
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the full mutation path: resolve, re-merge, publish
fn benchmark_refresh(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let aggregator = aggregator(&runtime, 100);

    let mut group = c.benchmark_group("refresh");
    group.bench_function("refresh_module_source", |b| {
        b.iter(|| {
            runtime
                .block_on(aggregator.refresh_source("layer2"))
                .unwrap();
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_deep_merge,
    benchmark_read_latency,
    benchmark_concurrent_reads,
    benchmark_refresh
);

criterion_main!(benches);

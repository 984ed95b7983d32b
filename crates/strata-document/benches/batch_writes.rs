#![allow(clippy::unwrap_used)]
//! Write and pipeline benchmarks for strata-document
//!
//! Compares batched copy-on-write updates against repeated single sets, and
//! parallel against sequential collection pipelines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use strata_document::document::{navigate, DocumentCollection, Step, WriteBatch};
use strata_document::{Document, Engine, EngineConfig};

fn wide_document(fields: usize) -> Document {
    let mut object = serde_json::Map::new();
    for i in 0..fields {
        object.insert(
            format!("f{}", i),
            json!({"id": i, "tags": ["a", "b", "c"], "meta": {"score": i * 3}}),
        );
    }
    Document::from(serde_json::Value::Object(object))
}

/// Benchmark many writes under one prefix, batched and unbatched
fn bench_writes(c: &mut Criterion) {
    let doc = wide_document(1000);
    let paths: Vec<String> = (0..100).map(|i| format!("f{}.meta.score", i)).collect();

    let mut group = c.benchmark_group("writes");
    group.throughput(Throughput::Elements(paths.len() as u64));

    group.bench_function("individual_sets", |b| {
        b.iter(|| {
            let mut current = doc.clone();
            for path in &paths {
                current = navigate::set(&current, path.as_str(), 0).unwrap();
            }
            black_box(current)
        })
    });

    group.bench_function("write_batch", |b| {
        b.iter(|| {
            let mut batch = WriteBatch::new(&doc);
            for path in &paths {
                batch.set(path.as_str(), 0).unwrap();
            }
            black_box(batch.finish())
        })
    });

    group.finish();
}

/// Benchmark a pipeline over collections of increasing size
fn bench_apply(c: &mut Criterion) {
    let step = Step::chain(vec![
        Step::set("f1.meta.score", 0).unwrap(),
        Step::get("f1").unwrap(),
    ]);

    let mut group = c.benchmark_group("apply");
    for size in [16usize, 256, 2048] {
        let docs: DocumentCollection = (0..size).map(|_| wide_document(8)).collect();
        group.throughput(Throughput::Elements(size as u64));

        for parallel in [false, true] {
            let engine = Engine::new(EngineConfig {
                parallel,
                parallel_threshold: 0,
                ..Default::default()
            })
            .unwrap();
            let label = if parallel { "parallel" } else { "sequential" };
            group.bench_with_input(BenchmarkId::new(label, size), &docs, |b, docs| {
                b.iter(|| black_box(engine.apply(docs, &step).unwrap()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_writes, bench_apply);
criterion_main!(benches);

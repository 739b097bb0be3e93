use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rewind_checkpoint::{EntityCheckpointStore, InMemoryCache};
use serde_json::json;
use std::sync::Arc;

fn checkpoint_write_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint write", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = EntityCheckpointStore::new(Arc::new(InMemoryCache::new()));
            store
                .checkpoint("profile", "bench-entity", black_box(json!({"score": 10})))
                .await
                .unwrap();
        });
    });
}

fn checkpoint_read_latest_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint read latest", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = EntityCheckpointStore::new(Arc::new(InMemoryCache::new()));
            store
                .checkpoint("profile", "bench-entity", json!({"score": 10}))
                .await
                .unwrap();

            store
                .get(black_box("profile"), black_box("bench-entity"), None)
                .await
                .unwrap();
        });
    });
}

criterion_group!(
    benches,
    checkpoint_write_benchmark,
    checkpoint_read_latest_benchmark
);
criterion_main!(benches);

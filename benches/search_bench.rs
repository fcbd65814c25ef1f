//! Benchmarks for similarity queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vecstore::backend::memory::MemoryBackend;
use vecstore::{
    DistanceMetric, QueryOptions, RecordId, StoreConfig, StoreEngine, Vector, VectorRecord,
};

fn random_records(n: usize, dim: usize) -> Vec<VectorRecord> {
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rand::random::<f32>()).collect();
            VectorRecord::without_metadata(RecordId::new(), Vector::new(data))
        })
        .collect()
}

fn benchmark_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for size in [100, 1000, 10000].iter() {
        let config = StoreConfig::new("bench", "bench_idx", "embedding")
            .with_dimensions(128)
            .with_metric(DistanceMetric::Cosine);
        let store = StoreEngine::with_flat_index(MemoryBackend::new(), config);
        store.setup().unwrap();
        store.add(&random_records(*size, 128)).unwrap();

        let query = Vector::new(vec![0.5; 128]);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                store
                    .query(black_box(&query), QueryOptions::with_limit(10))
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_query);
criterion_main!(benches);

//! Recall tests: verify HNSW agrees with the brute-force ground truth.

use rand::Rng;
use vecstore::{
    DistanceMetric, FlatIndex, HnswIndex, HnswParams, RecordId, Vector, VectorIndex,
};

fn random_vectors(n: usize, dim: usize) -> Vec<(RecordId, Vector)> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let data: Vec<f32> = (0..dim).map(|_| rng.gen::<f32>()).collect();
            (RecordId::new(), Vector::new(data))
        })
        .collect()
}

fn recall_at_k(truth: &[(RecordId, f32)], approx: &[(RecordId, f32)]) -> f64 {
    let expected: std::collections::HashSet<RecordId> =
        truth.iter().map(|(id, _)| *id).collect();
    let found = approx
        .iter()
        .filter(|(id, _)| expected.contains(id))
        .count();
    found as f64 / truth.len() as f64
}

fn check_recall(n: usize, dim: usize, k: usize, num_queries: usize, min_recall: f64) {
    let vectors = random_vectors(n, dim);

    let mut flat = FlatIndex::new(DistanceMetric::Euclidean);
    for (id, v) in &vectors {
        flat.insert(*id, v.clone()).unwrap();
    }

    let params = HnswParams::new(16, 200, 50);
    let mut hnsw = HnswIndex::with_params(DistanceMetric::Euclidean, params);
    for (id, v) in &vectors {
        hnsw.insert(*id, v.clone()).unwrap();
    }

    let queries = random_vectors(num_queries, dim);
    let mut total_recall = 0.0;

    for (_, query) in &queries {
        let truth = flat.search(query, k).unwrap();
        // Higher ef improves recall at search time
        let approx = hnsw.search_with_ef(query, k, 100).unwrap();
        total_recall += recall_at_k(&truth, &approx);
    }

    let avg_recall = total_recall / num_queries as f64;
    assert!(
        avg_recall >= min_recall,
        "Recall {:.3} is below threshold {:.3} for n={}, dim={}, k={}",
        avg_recall,
        min_recall,
        n,
        dim,
        k
    );
}

#[test]
fn test_small_datasets_are_exact() {
    // Below the exhaustive-scan threshold HNSW must match brute force
    // exactly, not just within recall tolerance.
    let vectors = random_vectors(500, 16);

    let mut flat = FlatIndex::new(DistanceMetric::Cosine);
    let mut hnsw = HnswIndex::new(DistanceMetric::Cosine);
    for (id, v) in &vectors {
        flat.insert(*id, v.clone()).unwrap();
        hnsw.insert(*id, v.clone()).unwrap();
    }

    for (_, query) in random_vectors(20, 16) {
        let truth = flat.search(&query, 5).unwrap();
        let approx = hnsw.search(&query, 5).unwrap();
        assert_eq!(
            truth.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
            approx.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        );
    }
}

#[test]
fn test_search_uses_configured_ef() {
    // Above the exhaustive-scan threshold the plain search must run
    // the graph with the ef_search it was configured with.
    let vectors = random_vectors(1500, 16);

    let params = HnswParams::new(8, 100, 7);
    let mut hnsw = HnswIndex::with_params(DistanceMetric::Euclidean, params);
    for (id, v) in &vectors {
        hnsw.insert(*id, v.clone()).unwrap();
    }

    for (_, query) in random_vectors(20, 16) {
        let configured = hnsw.search(&query, 5).unwrap();
        let explicit = hnsw.search_with_ef(&query, 5, 7).unwrap();
        assert_eq!(configured, explicit);
    }
}

#[test]
fn test_recall_2000_vectors() {
    check_recall(2000, 32, 10, 50, 0.90);
}

#[test]
fn test_recall_5000_vectors() {
    check_recall(5000, 64, 10, 20, 0.85);
}

//! Brute-force flat index — O(n) exhaustive scoring, reference ranking

use std::collections::HashMap;

use rayon::prelude::*;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::index::{rank, VectorIndex};
use crate::record::RecordId;
use crate::vector::Vector;

/// Above this many entries the scan scores candidates in parallel.
const PARALLEL_SCAN_THRESHOLD: usize = 4096;

/// A flat (brute-force) index that scores every stored vector.
///
/// This is the correctness baseline: its ranking is exact and defines
/// the order approximate indexes are measured against.
#[derive(Debug)]
pub struct FlatIndex {
    vectors: HashMap<RecordId, Vector>,
    metric: DistanceMetric,
}

impl FlatIndex {
    /// Create a new empty flat index with the given metric.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            vectors: HashMap::new(),
            metric,
        }
    }

    fn score_all(&self, query: &Vector) -> Result<Vec<(RecordId, f32)>> {
        if self.vectors.len() > PARALLEL_SCAN_THRESHOLD {
            self.vectors
                .par_iter()
                .map(|(&id, vec)| Ok((id, self.metric.score(query, vec)?)))
                .collect()
        } else {
            self.vectors
                .iter()
                .map(|(&id, vec)| Ok((id, self.metric.score(query, vec)?)))
                .collect()
        }
    }
}

impl VectorIndex for FlatIndex {
    fn with_metric(metric: DistanceMetric) -> Self {
        Self::new(metric)
    }

    fn insert(&mut self, id: RecordId, vector: Vector) -> Result<()> {
        self.vectors.insert(id, vector);
        Ok(())
    }

    fn remove(&mut self, id: RecordId) -> Result<()> {
        self.vectors.remove(&id);
        Ok(())
    }

    fn vector(&self, id: RecordId) -> Option<&Vector> {
        self.vectors.get(&id)
    }

    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(RecordId, f32)>> {
        let scored = self.score_all(query)?;
        Ok(rank(scored, k))
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_index_basic() {
        let mut index = FlatIndex::new(DistanceMetric::Cosine);
        let ids: Vec<RecordId> = (0..3).map(|_| RecordId::new()).collect();
        index.insert(ids[0], Vector::new(vec![1.0, 0.0])).unwrap();
        index.insert(ids[1], Vector::new(vec![0.0, 1.0])).unwrap();
        index
            .insert(ids[2], Vector::new(vec![0.9, 0.1]))
            .unwrap();

        let results = index.search(&Vector::new(vec![1.0, 0.0]), 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, ids[0]);
        assert_relative_eq!(results[0].1, 1.0, epsilon = 1e-6);
        assert_eq!(results[1].0, ids[2]);
        assert_eq!(results[2].0, ids[1]);
        assert_relative_eq!(results[2].1, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_flat_index_euclidean_best_first() {
        let mut index = FlatIndex::new(DistanceMetric::Euclidean);
        let near = RecordId::new();
        let far = RecordId::new();
        index.insert(near, Vector::new(vec![1.0, 1.0])).unwrap();
        index.insert(far, Vector::new(vec![5.0, 5.0])).unwrap();

        let results = index.search(&Vector::new(vec![1.0, 1.0]), 2).unwrap();
        assert_eq!(results[0].0, near);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_flat_index_insert_replaces() {
        let mut index = FlatIndex::new(DistanceMetric::Cosine);
        let id = RecordId::new();
        index.insert(id, Vector::new(vec![1.0, 0.0])).unwrap();
        index.insert(id, Vector::new(vec![0.0, 1.0])).unwrap();

        assert_eq!(index.len(), 1);
        assert_eq!(index.vector(id), Some(&Vector::new(vec![0.0, 1.0])));
    }

    #[test]
    fn test_flat_index_remove() {
        let mut index = FlatIndex::new(DistanceMetric::Cosine);
        let id = RecordId::new();
        index.insert(id, Vector::new(vec![1.0, 0.0])).unwrap();
        assert_eq!(index.len(), 1);

        index.remove(id).unwrap();
        assert_eq!(index.len(), 0);
        assert_eq!(index.vector(id), None);
    }
}

//! Index trait for pluggable nearest-neighbor search backends

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::record::RecordId;
use crate::vector::Vector;
use std::cmp::Ordering;

/// A nearest-neighbor index over `(RecordId, embedding)` pairs.
///
/// Implementations must return results ranked best-first (highest
/// score), with exact ties broken by ascending id byte value. The
/// brute-force `FlatIndex` defines the reference ranking; approximate
/// indexes may deviate within their documented recall, but never for
/// the top-1 result on small datasets.
pub trait VectorIndex: Send + Sync {
    /// Create an empty index using the given metric.
    fn with_metric(metric: DistanceMetric) -> Self
    where
        Self: Sized;

    /// Add a vector under the given id, replacing any previous entry.
    fn insert(&mut self, id: RecordId, vector: Vector) -> Result<()>;

    /// Remove the entry with the given id, if present.
    fn remove(&mut self, id: RecordId) -> Result<()>;

    /// Retrieve the stored vector for an id.
    fn vector(&self, id: RecordId) -> Option<&Vector>;

    /// Search for the `k` entries most similar to `query`.
    /// Returns `(id, score)` pairs sorted by descending score.
    fn search(&self, query: &Vector, k: usize) -> Result<Vec<(RecordId, f32)>>;

    /// The similarity metric used by this index.
    fn metric(&self) -> DistanceMetric;

    /// Number of entries in the index.
    fn len(&self) -> usize;

    /// Whether the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sort scored candidates into the ranking order the engine promises:
/// descending score, ascending id bytes on exact ties, truncated to `k`.
pub fn rank(mut scored: Vec<(RecordId, f32)>, k: usize) -> Vec<(RecordId, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
}

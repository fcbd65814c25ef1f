//! Similarity metrics for embedding vectors.
//!
//! All metrics follow one convention: higher score means more similar.
//! Euclidean distance is negated so the convention holds uniformly.

use crate::error::{Result, StoreError};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// Similarity metric, fixed per store instance at setup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Cosine similarity: dot(a,b) / (‖a‖·‖b‖), 0.0 when either vector
    /// has zero magnitude.
    Cosine,
    /// Negative L2 distance.
    Euclidean,
    /// Raw dot product.
    Dot,
}

impl DistanceMetric {
    /// Score two vectors under this metric. Higher is more similar.
    pub fn score(&self, a: &Vector, b: &Vector) -> Result<f32> {
        if a.dimensions() != b.dimensions() {
            return Err(StoreError::DimensionMismatch {
                expected: a.dimensions(),
                actual: b.dimensions(),
            });
        }

        Ok(match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::Euclidean => -euclidean_distance(a, b),
            DistanceMetric::Dot => a.dot(b),
        })
    }
}

/// Cosine similarity, clamped to [-1, 1] against floating point drift.
/// Defined as 0.0 when either vector has zero magnitude.
pub fn cosine_similarity(a: &Vector, b: &Vector) -> f32 {
    let norm_a = a.norm();
    let norm_b = b.norm();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (a.dot(b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Euclidean (L2) distance between two vectors.
pub fn euclidean_distance(a: &Vector, b: &Vector) -> f32 {
    a.as_slice()
        .iter()
        .zip(b.as_slice().iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cosine_identical() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        let score = DistanceMetric::Cosine.score(&v, &v).unwrap();
        assert_relative_eq!(score, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let v1 = Vector::new(vec![1.0, 0.0, 0.0]);
        let v2 = Vector::new(vec![0.0, 1.0, 0.0]);
        let score = DistanceMetric::Cosine.score(&v1, &v2).unwrap();
        assert_relative_eq!(score, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let v1 = Vector::new(vec![1.0, 0.0]);
        let v2 = Vector::new(vec![-1.0, 0.0]);
        let score = DistanceMetric::Cosine.score(&v1, &v2).unwrap();
        assert_relative_eq!(score, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero() {
        let zero = Vector::new(vec![0.0, 0.0]);
        let v = Vector::new(vec![1.0, 2.0]);
        let score = DistanceMetric::Cosine.score(&zero, &v).unwrap();
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_euclidean_is_negated() {
        let v1 = Vector::new(vec![1.0, 2.0, 3.0]);
        let v2 = Vector::new(vec![4.0, 5.0, 6.0]);
        let score = DistanceMetric::Euclidean.score(&v1, &v2).unwrap();
        assert_relative_eq!(score, -5.196152, epsilon = 1e-5);
    }

    #[test]
    fn test_euclidean_self_score() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        let score = DistanceMetric::Euclidean.score(&v, &v).unwrap();
        assert_relative_eq!(score, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dot_self_score_is_squared_norm() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        let score = DistanceMetric::Dot.score(&v, &v).unwrap();
        assert_relative_eq!(score, 14.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dimension_mismatch() {
        let v1 = Vector::new(vec![1.0, 2.0]);
        let v2 = Vector::new(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            DistanceMetric::Cosine.score(&v1, &v2),
            Err(StoreError::DimensionMismatch { .. })
        ));
    }
}

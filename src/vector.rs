//! Embedding vector type and operations

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// A fixed-dimensionality embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from raw components.
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.data.len()
    }

    /// The underlying components as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the vector, returning its components.
    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// L2 norm (magnitude).
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Dot product with another vector of the same dimensionality.
    pub fn dot(&self, other: &Vector) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Fail with `DimensionMismatch` unless this vector has `expected` dimensions.
    pub fn check_dimensions(&self, expected: usize) -> Result<()> {
        if self.dimensions() != expected {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: self.dimensions(),
            });
        }
        Ok(())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vector_creation() {
        let v = Vector::new(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.dimensions(), 3);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_vector_norm() {
        let v = Vector::new(vec![3.0, 4.0]);
        assert_relative_eq!(v.norm(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_vector_dot() {
        let v1 = Vector::new(vec![1.0, 2.0, 3.0]);
        let v2 = Vector::new(vec![4.0, 5.0, 6.0]);
        assert_relative_eq!(v1.dot(&v2), 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_check_dimensions() {
        let v = Vector::new(vec![1.0, 2.0]);
        assert!(v.check_dimensions(2).is_ok());
        assert!(matches!(
            v.check_dimensions(3),
            Err(StoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}

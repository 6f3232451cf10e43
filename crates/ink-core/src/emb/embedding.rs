//! Embedding vector representation.

use serde::{Deserialize, Serialize};

/// A dense float vector produced by an embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    /// The vector components.
    pub values: Vec<f32>,
}

impl Embedding {
    /// Creates an embedding from raw components.
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Returns the vector dimension.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// Returns the Euclidean norm of the vector.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    /// Returns a unit-norm copy of this vector.
    ///
    /// Zero vectors are returned unchanged since they cannot be normalised.
    pub fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > f32::EPSILON {
            for v in &mut self.values {
                *v /= norm;
            }
        }
        self
    }

    /// Consumes the embedding and returns the raw components.
    pub fn into_values(self) -> Vec<f32> {
        self.values
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();

    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_produces_unit_norm() {
        let embedding = Embedding::new(vec![3.0, 4.0]).normalized();
        assert!((embedding.norm() - 1.0).abs() <= 1e-4);
    }

    #[test]
    fn zero_vector_survives_normalization() {
        let embedding = Embedding::new(vec![0.0, 0.0]).normalized();
        assert_eq!(embedding.values, vec![0.0, 0.0]);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.2, -0.4, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() <= 1e-4);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() <= 1e-4);
    }

    #[test]
    fn cosine_handles_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}

//! Embedding vectors and L2 normalization.

use derive_more::{Deref, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, IntoStaticStr};

use crate::{Error, Result};

/// Smallest divisor used when normalizing, so a zero row stays finite.
pub const NORM_EPSILON: f32 = 1e-12;

/// Scales `values` in place to unit Euclidean length.
///
/// The divisor is clamped to [`NORM_EPSILON`]: a zero vector stays zero
/// instead of turning into NaNs.
pub fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    let divisor = norm.max(NORM_EPSILON);
    values.iter_mut().for_each(|v| *v /= divisor);
}

/// Modality tag attached to every embedding sent to the aggregation sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, IntoStaticStr)]
pub enum EmbeddingType {
    /// Embedding of a text item.
    #[serde(rename = "EMBEDDINGS_TEXT")]
    #[strum(serialize = "EMBEDDINGS_TEXT")]
    Text,
    /// Embedding of an image item.
    #[serde(rename = "EMBEDDINGS_IMAGE")]
    #[strum(serialize = "EMBEDDINGS_IMAGE")]
    Image,
}

/// A single unit-length embedding.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, Deref, Into)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Normalizes a raw model output row.
    pub fn normalized(mut raw: Vec<f32>) -> Self {
        l2_normalize(&mut raw);
        Self(raw)
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Returns the Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// Raw embeddings accumulated chunk by chunk, in item order.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingMatrix {
    rows: Vec<Vec<f32>>,
    dimension: Option<usize>,
}

impl EmbeddingMatrix {
    /// Creates an empty matrix with room for `rows` rows.
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            rows: Vec::with_capacity(rows),
            dimension: None,
        }
    }

    /// Appends the rows produced for one chunk.
    ///
    /// Every row must have the same, non-zero dimension as the rows already
    /// present.
    pub fn append(&mut self, chunk: Vec<Vec<f32>>) -> Result<()> {
        for row in &chunk {
            let expected = *self.dimension.get_or_insert(row.len());
            if row.is_empty() || row.len() != expected {
                return Err(Error::model_inference(format!(
                    "embedding dimension mismatch: expected {expected}, got {}",
                    row.len()
                )));
            }
        }

        self.rows.extend(chunk);
        Ok(())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no rows were appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the shared row dimension, if any row was appended.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Normalizes every row to unit length.
    pub fn into_normalized(self) -> Vec<EmbeddingVector> {
        self.rows.into_iter().map(EmbeddingVector::normalized).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unit_length() {
        let vector = EmbeddingVector::normalized(vec![3.0, 4.0]);
        assert!((vector.norm() - 1.0).abs() < 1e-6);
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let vector = EmbeddingVector::normalized(vec![0.0; 4]);
        assert!(vector.iter().all(|v| v.is_finite()));
        assert!(vector.norm() <= 1.0);
    }

    #[test]
    fn test_normalize_tiny_vector() {
        let vector = EmbeddingVector::normalized(vec![1e-30, -1e-30]);
        assert!(vector.iter().all(|v| v.is_finite()));
        assert!(vector.norm() <= 1.0 + 1e-6);
    }

    #[test]
    fn test_embedding_type_wire_format() {
        assert_eq!(
            serde_json::to_value(EmbeddingType::Text).unwrap(),
            "EMBEDDINGS_TEXT"
        );
        assert_eq!(EmbeddingType::Image.to_string(), "EMBEDDINGS_IMAGE");
    }

    #[test]
    fn test_matrix_append_and_normalize() {
        let mut matrix = EmbeddingMatrix::with_capacity(3);
        matrix.append(vec![vec![1.0, 0.0], vec![0.0, 2.0]]).unwrap();
        matrix.append(vec![vec![0.0, 0.0]]).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix.dimension(), Some(2));

        let rows = matrix.into_normalized();
        assert_eq!(rows[1].as_slice(), &[0.0, 1.0]);
        assert_eq!(rows[2].as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_matrix_rejects_dimension_mismatch() {
        let mut matrix = EmbeddingMatrix::default();
        matrix.append(vec![vec![1.0, 0.0]]).unwrap();
        assert!(matrix.append(vec![vec![1.0, 0.0, 0.0]]).is_err());
        assert!(EmbeddingMatrix::default().append(vec![Vec::new()]).is_err());
    }
}

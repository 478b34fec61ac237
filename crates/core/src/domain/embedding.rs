use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub model: String,
    pub values: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(model: impl Into<String>, values: Vec<f32>) -> Result<Self, DomainError> {
        if values.is_empty() {
            return Err(DomainError::EmptyEmbedding);
        }
        Ok(Self { model: model.into(), values })
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Vectors are only comparable when produced by the same model at the same width.
    pub fn ensure_comparable(&self, other: &Self) -> Result<(), DomainError> {
        if self.model == other.model && self.dimension() == other.dimension() {
            return Ok(());
        }

        Err(DomainError::EmbeddingMismatch {
            expected_model: self.model.clone(),
            expected_dimension: self.dimension(),
            found_model: other.model.clone(),
            found_dimension: other.dimension(),
        })
    }

    pub fn euclidean_distance(&self, other: &Self) -> Result<f64, DomainError> {
        self.ensure_comparable(other)?;

        let sum = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(left, right)| {
                let delta = f64::from(*left) - f64::from(*right);
                delta * delta
            })
            .sum::<f64>();

        Ok(sum.sqrt())
    }
}

/// A previously stored embedding that can be surfaced as a similar conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub source_type: String,
    pub source_id: String,
    pub text: String,
    pub vector: EmbeddingVector,
}

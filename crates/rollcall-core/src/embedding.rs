//! Fixed-length face embedding vectors.
//!
//! Embeddings persist as little-endian `f32` blobs of exactly `dim * 4`
//! bytes. All arithmetic here is side-effect free.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Face embedding vector (512-dimensional for ArcFace-family models).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct EmbeddingVector {
    values: Vec<f32>,
}

impl EmbeddingVector {
    /// Build a vector from raw components, checking the expected dimension.
    pub fn new(values: Vec<f32>, dim: usize) -> Result<Self> {
        if values.len() != dim {
            return Err(Error::MalformedEmbedding(format!(
                "expected {dim}-dim embedding, got {}",
                values.len()
            )));
        }
        Self::try_from(values)
    }

    /// Decode a stored blob of little-endian `f32` values.
    pub fn from_bytes(bytes: &[u8], dim: usize) -> Result<Self> {
        if bytes.len() % F32_BYTES != 0 {
            return Err(Error::MalformedEmbedding(format!(
                "blob length {} is not a multiple of {F32_BYTES}",
                bytes.len()
            )));
        }
        let values = bytes
            .chunks_exact(F32_BYTES)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self::new(values, dim)
    }

    /// Encode as a little-endian `f32` blob.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Dot product, accumulated in `f64`. Fails if the dimensions differ.
    pub fn dot(&self, other: &EmbeddingVector) -> Result<f64> {
        if self.dim() != other.dim() {
            return Err(Error::MalformedEmbedding(format!(
                "dimension mismatch: {} vs {}",
                self.dim(),
                other.dim()
            )));
        }
        Ok(self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| f64::from(a) * f64::from(b))
            .sum())
    }

    /// Euclidean (L2) norm, accumulated in `f64`.
    ///
    /// Any finite `f32` components square and sum without overflow or
    /// underflow in `f64`, so the norm is zero only for the zero vector.
    pub fn norm(&self) -> f64 {
        self.values
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt()
    }

    /// True for the zero vector, which has no direction to compare.
    pub fn is_degenerate(&self) -> bool {
        self.norm() == 0.0
    }

    /// Cosine similarity in [-1, 1]. Higher = more similar.
    ///
    /// A zero-norm operand yields [`Error::DegenerateVector`] instead of NaN.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> Result<f32> {
        let dot = self.dot(other)?;
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return Err(Error::DegenerateVector);
        }
        // Rounding can push |cos| a hair past 1.
        Ok((dot / denom).clamp(-1.0, 1.0) as f32)
    }
}

impl TryFrom<Vec<f32>> for EmbeddingVector {
    type Error = Error;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::MalformedEmbedding("empty embedding".into()));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::MalformedEmbedding(format!(
                "non-finite component at index {idx}"
            )));
        }
        Ok(Self { values })
    }
}

impl From<EmbeddingVector> for Vec<f32> {
    fn from(v: EmbeddingVector) -> Self {
        v.values
    }
}

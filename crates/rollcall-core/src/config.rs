use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default cosine similarity threshold for a positive match.
///
/// Tuned for ArcFace-family embeddings; other models need their own value.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;

/// Default embedding dimensionality (ArcFace w600k_r50).
pub const DEFAULT_EMBEDDING_DIM: usize = 512;

/// Matching policy shared by the matcher and the enrollment/marking flows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// A candidate matches only if its similarity is strictly greater than this.
    pub similarity_threshold: f32,
    /// Number of `f32` components in every embedding.
    pub embedding_dim: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        check_threshold(self.similarity_threshold)?;
        if self.embedding_dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be non-zero".into()));
        }
        Ok(())
    }
}

/// Cosine scores live in [-1, 1]; anything else (NaN included) is a caller bug.
pub(crate) fn check_threshold(threshold: f32) -> Result<()> {
    if !(-1.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidConfig(format!(
            "similarity threshold must be within [-1, 1], got {threshold}"
        )));
    }
    Ok(())
}

//! Best-match search of a probe embedding over the enrolled gallery.

use std::sync::Arc;

use crate::config::{check_threshold, EngineConfig};
use crate::embedding::EmbeddingVector;
use crate::error::{Error, Result};
use crate::store::EmbeddingStore;
use crate::types::{Identity, MatchResult};

/// Strategy for comparing a probe embedding against a gallery of enrolled faces.
///
/// [`CosineMatcher`] is an exhaustive scan; an indexed strategy can replace it
/// without touching [`SimilarityMatcher`] callers.
pub trait Matcher: Send + Sync {
    fn compare(
        &self,
        probe: &EmbeddingVector,
        gallery: &[Identity],
        threshold: f32,
    ) -> Result<MatchResult>;
}

/// Exhaustive cosine-similarity scan, O(n) in gallery size.
///
/// Ties on the maximum score go to the entry seen first in gallery order.
/// Gallery entries that cannot be scored (zero norm, wrong dimension, a
/// non-finite score) are skipped with a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(
        &self,
        probe: &EmbeddingVector,
        gallery: &[Identity],
        threshold: f32,
    ) -> Result<MatchResult> {
        if probe.is_degenerate() {
            return Err(Error::DegenerateVector);
        }

        let mut best: Option<(usize, f32)> = None;

        for (i, candidate) in gallery.iter().enumerate() {
            let sim = match probe.cosine_similarity(&candidate.embedding) {
                Ok(sim) if sim.is_finite() => sim,
                Ok(sim) => {
                    tracing::warn!(
                        identity_key = %candidate.identity_key,
                        score = sim,
                        "skipping gallery entry with non-finite score"
                    );
                    continue;
                }
                Err(err) => {
                    tracing::warn!(
                        identity_key = %candidate.identity_key,
                        error = %err,
                        "skipping unscorable gallery entry"
                    );
                    continue;
                }
            };
            // Strict comparison: the first of equal scores wins.
            if best.map_or(true, |(_, best_sim)| sim > best_sim) {
                best = Some((i, sim));
            }
        }

        match best {
            Some((idx, score)) if score > threshold => {
                let hit = &gallery[idx];
                Ok(MatchResult::Match {
                    identity_key: hit.identity_key.clone(),
                    display_name: hit.display_name.clone(),
                    score,
                })
            }
            _ => Ok(MatchResult::NoMatch),
        }
    }
}

/// Best-match search over an [`EmbeddingStore`].
///
/// Read-only: takes a snapshot of the store per search and never writes.
pub struct SimilarityMatcher<S, M = CosineMatcher> {
    store: Arc<S>,
    matcher: M,
    config: EngineConfig,
}

impl<S: EmbeddingStore> SimilarityMatcher<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        Self::with_matcher(store, CosineMatcher, config)
    }
}

impl<S: EmbeddingStore, M: Matcher> SimilarityMatcher<S, M> {
    pub fn with_matcher(store: Arc<S>, matcher: M, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, matcher, config })
    }

    /// Search with the configured threshold.
    pub async fn best_match(&self, probe: &EmbeddingVector) -> Result<MatchResult> {
        self.find_best_match(probe, self.config.similarity_threshold).await
    }

    /// Return the highest-scoring identity if its similarity strictly
    /// exceeds `threshold`, otherwise [`MatchResult::NoMatch`].
    ///
    /// `threshold` must lie in [-1, 1].
    pub async fn find_best_match(
        &self,
        probe: &EmbeddingVector,
        threshold: f32,
    ) -> Result<MatchResult> {
        check_threshold(threshold)?;
        self.check_probe(probe)?;
        let gallery = self.store.list_all().await?;
        self.search(probe, &gallery, threshold)
    }

    /// Search a gallery snapshot the caller already holds, with the
    /// configured threshold.
    ///
    /// Backends call this from inside their atomic enroll step, where the
    /// snapshot and the insert that depends on it share one transaction.
    pub fn match_snapshot(
        &self,
        probe: &EmbeddingVector,
        gallery: &[Identity],
    ) -> Result<MatchResult> {
        self.check_probe(probe)?;
        self.search(probe, gallery, self.config.similarity_threshold)
    }

    fn check_probe(&self, probe: &EmbeddingVector) -> Result<()> {
        if probe.dim() != self.config.embedding_dim {
            return Err(Error::MalformedEmbedding(format!(
                "expected {}-dim probe, got {}",
                self.config.embedding_dim,
                probe.dim()
            )));
        }
        Ok(())
    }

    fn search(
        &self,
        probe: &EmbeddingVector,
        gallery: &[Identity],
        threshold: f32,
    ) -> Result<MatchResult> {
        let result = self.matcher.compare(probe, gallery, threshold)?;

        match &result {
            MatchResult::Match { identity_key, score, .. } => {
                tracing::info!(%identity_key, score, threshold, gallery = gallery.len(), "match found");
            }
            MatchResult::NoMatch => {
                tracing::info!(threshold, gallery = gallery.len(), "no match above threshold");
            }
        }
        Ok(result)
    }
}

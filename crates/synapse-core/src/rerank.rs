//! Cross-encoder reranking of coarse candidates.
//!
//! Every candidate is scored against the query as a `(query, text)` pair
//! by a [`PairScorer`], then the list is sorted by score (descending,
//! stable on ties) and truncated to `top_k`.
//!
//! The scorer is only called when there is something to rank: empty input
//! or `top_k <= 0` return an empty list without touching the model.

use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Candidate, RankedResult};

/// Pairwise relevance capability (cross-encoder).
#[async_trait]
pub trait PairScorer: Send + Sync {
    /// Returns the model identifier (e.g. `"bge-reranker-base"`).
    fn model_name(&self) -> &str;

    /// Score each `(query, text)` pair; one score per pair, same order.
    /// Higher means more relevant.
    async fn score_batch(&self, pairs: &[(&str, &str)]) -> AnyResult<Vec<f32>>;
}

/// Reranks candidates with an injected [`PairScorer`].
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn PairScorer>,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairScorer>) -> Self {
        Self { scorer }
    }

    /// Score, sort and truncate `candidates` for `query`.
    ///
    /// # Guarantees
    ///
    /// - Output length is at most `max(top_k, 0)`.
    /// - `rerank_score` is non-increasing along the output.
    /// - Candidates with equal scores keep their input order.
    ///
    /// # Errors
    ///
    /// [`Error::Rerank`] if the scorer fails, returns the wrong number of
    /// scores, or returns a non-finite score.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: i64,
    ) -> Result<Vec<RankedResult>> {
        if candidates.is_empty() || top_k <= 0 {
            return Ok(Vec::new());
        }

        let pairs: Vec<(&str, &str)> = candidates
            .iter()
            .map(|c| (query, c.text.as_str()))
            .collect();

        let scores = self
            .scorer
            .score_batch(&pairs)
            .await
            .map_err(Error::rerank)?;

        if scores.len() != candidates.len() {
            return Err(Error::rerank(format!(
                "scorer returned {} scores for {} candidates",
                scores.len(),
                candidates.len()
            )));
        }
        if let Some(pos) = scores.iter().position(|s| !s.is_finite()) {
            return Err(Error::rerank(format!(
                "scorer returned non-finite score for candidate {}",
                pos
            )));
        }

        let mut ranked: Vec<RankedResult> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, rerank_score)| RankedResult {
                candidate,
                rerank_score,
            })
            .collect();

        // `sort_by` is stable, so equal scores keep arrival order.
        ranked.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k as usize);

        tracing::debug!(
            model = self.scorer.model_name(),
            kept = ranked.len(),
            top_k,
            "reranked candidates"
        );

        Ok(ranked)
    }
}

//! Query path: coarse vector search followed by cross-encoder reranking.
//!
//! ```text
//! query ──► VectorIndex::query(n = max(top_k × 3, 15)) ──► Reranker::rerank(top_k) ──► results
//! ```
//!
//! The [`Retriever`] is the only component that talks to the index and the
//! reranker on the query path. A reranking failure fails the whole call;
//! coarse order is never returned in its place.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::RankedResult;
use crate::rerank::Reranker;
use crate::store::VectorIndex;

/// Over-fetch policy for coarse candidate generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetrievalParams {
    /// Candidates fetched per requested result.
    pub overfetch_factor: i64,
    /// Lower bound on the candidate count.
    pub min_candidates: i64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            overfetch_factor: 3,
            min_candidates: 15,
        }
    }
}

impl RetrievalParams {
    /// Number of coarse candidates to request for `top_k` final results.
    pub fn candidate_count(&self, top_k: i64) -> usize {
        let wanted = top_k.saturating_mul(self.overfetch_factor);
        wanted.max(self.min_candidates).max(0) as usize
    }
}

/// Two-stage retriever over an injected index and reranker.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    reranker: Reranker,
    params: RetrievalParams,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, reranker: Reranker) -> Self {
        Self {
            index,
            reranker,
            params: RetrievalParams::default(),
        }
    }

    pub fn with_params(mut self, params: RetrievalParams) -> Self {
        self.params = params;
        self
    }

    pub fn params(&self) -> RetrievalParams {
        self.params
    }

    /// Retrieve the `top_k` most relevant chunks for `query`.
    ///
    /// Optionally restricted to a single document. An empty or
    /// whitespace-only query is rejected before the index is touched, and
    /// `top_k <= 0` returns nothing without touching it either.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: i64,
        document_id: Option<&str>,
    ) -> Result<Vec<RankedResult>> {
        if query.trim().is_empty() {
            return Err(Error::validation("query must not be empty"));
        }
        if top_k <= 0 {
            return Ok(Vec::new());
        }

        let n_results = self.params.candidate_count(top_k);
        let candidates = self.index.query(query, n_results, document_id).await?;

        tracing::debug!(
            requested = n_results,
            candidates = candidates.len(),
            document_id = document_id.unwrap_or("*"),
            "coarse candidates fetched"
        );

        self.reranker.rerank(query, candidates, top_k).await
    }
}

//! Cross-encoder providers implementing [`synapse_core::rerank::PairScorer`].
//!
//! - **[`DisabledScorer`]**: every call fails, so retrieval fails instead of
//!   silently returning unranked candidates.
//! - **`LocalScorer`**: fastembed `TextRerank`, in-process (feature `local-models`).
//! - **[`HttpScorer`]**: an OpenAI-compatible `POST {url}/v1/rerank` server.
//!
//! Scores are raw model outputs; only their order matters.

#[cfg(feature = "local-models")]
mod local;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use synapse_core::rerank::PairScorer;

use crate::config::RerankerConfig;

#[cfg(feature = "local-models")]
pub use local::LocalScorer;

/// Pair indices grouped by query, in order of first appearance.
///
/// Cross-encoder backends take one query with many documents, so pairs
/// sharing a query are scored in one request.
pub fn group_by_query<'a>(pairs: &[(&'a str, &str)]) -> Vec<(&'a str, Vec<usize>)> {
    let mut groups: Vec<(&'a str, Vec<usize>)> = Vec::new();
    for (i, (query, _)) in pairs.iter().enumerate() {
        match groups.iter_mut().find(|(q, _)| q == query) {
            Some((_, idx)) => idx.push(i),
            None => groups.push((*query, vec![i])),
        }
    }
    groups
}

/// Place `(index, score)` results for `group` back into `scores`.
///
/// `index` refers to a position within `group`. Every member of the group
/// must receive exactly one score.
pub fn scatter_scores(
    scores: &mut [Option<f32>],
    group: &[usize],
    results: impl IntoIterator<Item = (usize, f32)>,
) -> Result<()> {
    for (index, score) in results {
        let slot = group
            .get(index)
            .with_context(|| format!("reranker returned out-of-range index {}", index))?;
        if scores[*slot].replace(score).is_some() {
            bail!("reranker returned index {} twice", index);
        }
    }
    Ok(())
}

fn collect_scores(scores: Vec<Option<f32>>) -> Result<Vec<f32>> {
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.with_context(|| format!("reranker returned no score for pair {}", i)))
        .collect()
}

// ============ Disabled Provider ============

pub struct DisabledScorer;

#[async_trait]
impl PairScorer for DisabledScorer {
    fn model_name(&self) -> &str {
        "disabled"
    }
    async fn score_batch(&self, _pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        bail!("Reranker provider is disabled; set [reranker].provider in the config")
    }
}

// ============ HTTP Provider ============

/// Cross-encoder served over an OpenAI-compatible `/v1/rerank` endpoint.
pub struct HttpScorer {
    endpoint: String,
    model: String,
    batch_size: usize,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}

impl HttpScorer {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .context("reranker.url required for http provider")?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: format!("{}/v1/rerank", base_url.trim_end_matches('/')),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            batch_size: config.batch_size.max(1),
            client,
        })
    }

    async fn rerank_once(&self, query: &str, documents: Vec<&str>) -> Result<Vec<(usize, f32)>> {
        let body = RerankRequest {
            model: &self.model,
            query,
            top_n: documents.len(),
            documents,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach reranker endpoint {}", self.endpoint))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Reranker returned {}: {}", status, text);
        }

        let parsed: RerankResponse = resp
            .json()
            .await
            .context("Failed to parse reranker response")?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| (r.index, r.relevance_score))
            .collect())
    }
}

#[async_trait]
impl PairScorer for HttpScorer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn score_batch(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        let mut scores = vec![None; pairs.len()];

        for (query, members) in group_by_query(pairs) {
            for batch in members.chunks(self.batch_size) {
                let documents: Vec<&str> = batch.iter().map(|&i| pairs[i].1).collect();
                let results = self.rerank_once(query, documents).await?;
                scatter_scores(&mut scores, batch, results)?;
            }
        }

        collect_scores(scores)
    }
}

// ============ Factory ============

/// Create the [`PairScorer`] named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledScorer`] |
/// | `"local"` | `LocalScorer` (feature `local-models`) |
/// | `"http"` | [`HttpScorer`] |
pub fn create_scorer(config: &RerankerConfig) -> Result<Arc<dyn PairScorer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledScorer)),
        "http" => Ok(Arc::new(HttpScorer::new(config)?)),
        #[cfg(feature = "local-models")]
        "local" => Ok(Arc::new(LocalScorer::new(config)?)),
        #[cfg(not(feature = "local-models"))]
        "local" => bail!("Local reranker requires --features local-models"),
        other => bail!("Unknown reranker provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_query_keeps_first_appearance() {
        let pairs = [("q1", "a"), ("q2", "b"), ("q1", "c"), ("q2", "d"), ("q3", "e")];
        let groups = group_by_query(&pairs);
        assert_eq!(
            groups,
            vec![("q1", vec![0, 2]), ("q2", vec![1, 3]), ("q3", vec![4])]
        );
    }

    #[test]
    fn test_scatter_scores_maps_group_positions() {
        let mut scores = vec![None; 4];
        scatter_scores(&mut scores, &[1, 3], vec![(1, 0.9), (0, 0.2)]).unwrap();
        assert_eq!(scores, vec![None, Some(0.2), None, Some(0.9)]);
    }

    #[test]
    fn test_scatter_scores_rejects_bad_indices() {
        let mut scores = vec![None; 2];
        assert!(scatter_scores(&mut scores, &[0, 1], vec![(5, 1.0)]).is_err());
        let mut scores = vec![None; 2];
        assert!(scatter_scores(&mut scores, &[0, 1], vec![(0, 1.0), (0, 2.0)]).is_err());
    }

    #[test]
    fn test_collect_scores_requires_every_pair() {
        assert!(collect_scores(vec![Some(1.0), None]).is_err());
        assert_eq!(collect_scores(vec![Some(1.0), Some(0.5)]).unwrap(), vec![1.0, 0.5]);
    }

    #[tokio::test]
    async fn test_disabled_scorer_errors() {
        let scorer = create_scorer(&RerankerConfig::default()).unwrap();
        assert_eq!(scorer.model_name(), "disabled");
        assert!(scorer.score_batch(&[("q", "t")]).await.is_err());
    }

    #[test]
    fn test_http_scorer_endpoint() {
        let config = RerankerConfig {
            provider: "http".to_string(),
            url: Some("http://localhost:8080/".to_string()),
            ..RerankerConfig::default()
        };
        let scorer = HttpScorer::new(&config).unwrap();
        assert_eq!(scorer.endpoint, "http://localhost:8080/v1/rerank");
        assert_eq!(scorer.model_name(), "default");
    }

    #[test]
    fn test_http_scorer_requires_url() {
        let config = RerankerConfig {
            provider: "http".to_string(),
            ..RerankerConfig::default()
        };
        assert!(create_scorer(&config).is_err());
    }
}

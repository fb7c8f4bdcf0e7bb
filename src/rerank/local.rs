//! In-process cross-encoder via fastembed `TextRerank`.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use synapse_core::rerank::PairScorer;

use super::{collect_scores, group_by_query, scatter_scores};
use crate::config::RerankerConfig;
use crate::local_model::LazyModel;

const DEFAULT_MODEL: &str = "bge-reranker-base";

pub struct LocalScorer {
    model_name: String,
    batch_size: usize,
    kind: fastembed::RerankerModel,
    model: LazyModel<fastembed::TextRerank>,
}

impl LocalScorer {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let kind = config_to_reranker_model(&model_name)?;

        Ok(Self {
            model_name,
            batch_size: config.batch_size.max(1),
            kind,
            model: LazyModel::new("local reranker", Duration::from_secs(config.timeout_secs)),
        })
    }
}

#[async_trait]
impl PairScorer for LocalScorer {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn score_batch(&self, pairs: &[(&str, &str)]) -> Result<Vec<f32>> {
        let groups: Vec<(String, Vec<usize>, Vec<String>)> = group_by_query(pairs)
            .into_iter()
            .map(|(query, members)| {
                let docs = members.iter().map(|&i| pairs[i].1.to_string()).collect();
                (query.to_string(), members, docs)
            })
            .collect();
        let total = pairs.len();
        let kind = self.kind.clone();
        let batch_size = self.batch_size;

        self.model
            .run(
                move || {
                    fastembed::TextRerank::try_new(
                        fastembed::RerankInitOptions::new(kind).with_show_download_progress(true),
                    )
                    .map_err(|e| anyhow::anyhow!("Failed to initialize local reranker: {}", e))
                },
                move |model| {
                    let mut scores = vec![None; total];
                    for (query, members, docs) in &groups {
                        let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
                        let results = model
                            .rerank(query.as_str(), &docs, false, Some(batch_size))
                            .map_err(|e| anyhow::anyhow!("Local rerank failed: {}", e))?;
                        scatter_scores(
                            &mut scores,
                            members,
                            results.into_iter().map(|r| (r.index, r.score)),
                        )?;
                    }
                    collect_scores(scores)
                },
            )
            .await
    }
}

fn config_to_reranker_model(name: &str) -> Result<fastembed::RerankerModel> {
    match name {
        "bge-reranker-base" => Ok(fastembed::RerankerModel::BGERerankerBase),
        "bge-reranker-v2-m3" => Ok(fastembed::RerankerModel::BGERerankerV2M3),
        "jina-reranker-v1-turbo-en" => Ok(fastembed::RerankerModel::JINARerankerV1TurboEn),
        other => bail!(
            "Unknown local reranker model: '{}'. Supported models: \
             bge-reranker-base, bge-reranker-v2-m3, jina-reranker-v1-turbo-en",
            other
        ),
    }
}

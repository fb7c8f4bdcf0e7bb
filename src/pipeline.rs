//! Wires configuration into the core pipeline components.

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

use synapse_core::chunk::{EmbeddingSimilarity, NoBoundaries, SegmentSimilarity, SemanticChunker};
use synapse_core::embedding::Embedder;
use synapse_core::ingest::Ingestor;
use synapse_core::rerank::Reranker;
use synapse_core::retrieve::Retriever;
use synapse_core::store::VectorIndex;

use crate::config::Config;
use crate::db;
use crate::embedding::create_embedder;
use crate::rerank::create_scorer;
use crate::sqlite_store::SqliteIndex;

/// Everything a command needs, built from one [`Config`].
pub struct Pipeline {
    pub pool: SqlitePool,
    pub index: Arc<SqliteIndex>,
    pub ingestor: Ingestor,
    pub retriever: Retriever,
}

impl Pipeline {
    pub async fn open(config: &Config) -> Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let pool = db::connect(config).await?;
        Self::with_parts(config, pool, embedder, create_scorer(&config.reranker)?)
    }

    /// Assemble a pipeline from explicit parts.
    pub fn with_parts(
        config: &Config,
        pool: SqlitePool,
        embedder: Arc<dyn Embedder>,
        scorer: Arc<dyn synapse_core::rerank::PairScorer>,
    ) -> Result<Self> {
        let index = Arc::new(
            SqliteIndex::new(pool.clone(), &config.db.collection, embedder.clone())
                .with_metric(config.retrieval.distance),
        );
        let shared: Arc<dyn VectorIndex> = index.clone();

        let chunker = build_chunker(config, embedder, config.chunking.max_chars)?;
        let ingestor = Ingestor::new(chunker, shared.clone());
        let retriever =
            Retriever::new(shared, Reranker::new(scorer)).with_params(config.retrieval.params());

        Ok(Self {
            pool,
            index,
            ingestor,
            retriever,
        })
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Build the chunker for `config`.
///
/// Semantic boundaries need an embedder; with embeddings disabled the
/// chunker only applies the `max_chars` ceiling.
pub fn build_chunker(
    config: &Config,
    embedder: Arc<dyn Embedder>,
    max_chars: usize,
) -> Result<SemanticChunker> {
    let oracle: Arc<dyn SegmentSimilarity> = if config.embedding.is_enabled() {
        Arc::new(EmbeddingSimilarity::new(embedder, config.chunking.buffer_size))
    } else {
        Arc::new(NoBoundaries)
    };
    Ok(SemanticChunker::new(max_chars, oracle).with_strategy(config.chunking.strategy()?))
}

//! Indexing path: normalize, chunk, then store.

use std::sync::Arc;

use serde::Serialize;

use crate::chunk::SemanticChunker;
use crate::error::{Error, Result};
use crate::normalize::normalize;
use crate::store::VectorIndex;

/// Outcome of a successful [`Ingestor::ingest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    pub chunk_count: usize,
}

/// Turns raw document text into indexed chunks.
pub struct Ingestor {
    chunker: SemanticChunker,
    index: Arc<dyn VectorIndex>,
}

impl Ingestor {
    pub fn new(chunker: SemanticChunker, index: Arc<dyn VectorIndex>) -> Self {
        Self { chunker, index }
    }

    /// Chunk and store a document, replacing any earlier version of it.
    pub async fn ingest(
        &self,
        document_id: &str,
        document_name: &str,
        raw_text: &str,
    ) -> Result<IngestReport> {
        if document_id.trim().is_empty() {
            return Err(Error::validation("document_id must not be empty"));
        }

        let chunks = self.preview(raw_text).await?;
        if chunks.is_empty() {
            return Err(Error::validation(format!(
                "no chunks generated for document '{}'",
                document_id
            )));
        }

        let chunk_count = self.index.add(document_id, document_name, &chunks).await?;

        Ok(IngestReport {
            document_id: document_id.to_string(),
            chunk_count,
        })
    }

    /// Chunk `raw_text` without writing anything.
    ///
    /// Fails with a validation error when the text is empty after
    /// normalization.
    pub async fn preview(&self, raw_text: &str) -> Result<Vec<String>> {
        if normalize(raw_text).is_empty() {
            return Err(Error::validation("no readable text in document"));
        }
        self.chunker.chunk(raw_text).await
    }
}

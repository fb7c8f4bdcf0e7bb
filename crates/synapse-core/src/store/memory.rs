//! In-memory [`VectorIndex`] implementation for tests and embedding hosts.
//!
//! Uses a `HashMap` of per-document chunk lists behind `std::sync::RwLock`.
//! Vector search is brute-force over all stored vectors in scope.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embedding::{DistanceMetric, Embedder};
use crate::error::{Error, Result};
use crate::models::{Candidate, Chunk, DocumentSummary};

use super::{rank_by_distance, validate_add, validate_vectors, DocumentLocks, VectorIndex};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    metric: DistanceMetric,
    docs: RwLock<HashMap<String, Vec<StoredChunk>>>,
    write_locks: DocumentLocks,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            metric: DistanceMetric::default(),
            docs: RwLock::new(HashMap::new()),
            write_locks: DocumentLocks::new(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Total number of stored chunks across all documents.
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<StoredChunk>>> {
        self.docs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<StoredChunk>>> {
        self.docs.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(
        &self,
        document_id: &str,
        document_name: &str,
        chunks: &[String],
    ) -> Result<usize> {
        validate_add(document_id, chunks)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_locks.lock(document_id).await;

        let vectors = self
            .embedder
            .embed(chunks)
            .await
            .map_err(|e| Error::index_write(document_id, e))?;
        validate_vectors(document_id, chunks.len(), &vectors)?;

        let stored: Vec<StoredChunk> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (text, vector))| StoredChunk {
                chunk: Chunk::new(document_id, document_name, i, text),
                vector,
            })
            .collect();

        self.write().insert(document_id.to_string(), stored);

        tracing::info!(document_id, chunks = chunks.len(), "indexed document");
        Ok(chunks.len())
    }

    async fn query(
        &self,
        query_text: &str,
        n_results: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }

        let in_scope = {
            let docs = self.read();
            match document_id {
                Some(id) => docs.get(id).map_or(0, Vec::len),
                None => docs.values().map(Vec::len).sum(),
            }
        };
        if in_scope == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed_one(query_text)
            .await
            .map_err(Error::index_query)?;

        let docs = self.read();
        let scope: Box<dyn Iterator<Item = &StoredChunk> + '_> = match document_id {
            Some(id) => Box::new(docs.get(id).into_iter().flatten()),
            None => Box::new(docs.values().flatten()),
        };

        let mut candidates: Vec<Candidate> = scope
            .map(|sc| Candidate {
                chunk_id: sc.chunk.chunk_id.clone(),
                text: sc.chunk.text.clone(),
                distance: self.metric.distance(&query_vec, &sc.vector),
                metadata: sc.chunk.metadata(),
            })
            .collect();

        rank_by_distance(&mut candidates, n_results);
        Ok(candidates)
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let _guard = self.write_locks.lock(document_id).await;
        Ok(self.write().remove(document_id).map_or(0, |c| c.len()))
    }

    async fn documents(&self) -> Result<Vec<DocumentSummary>> {
        let docs = self.read();
        let mut summaries: Vec<DocumentSummary> = docs
            .iter()
            .map(|(id, chunks)| DocumentSummary {
                document_id: id.clone(),
                document_name: chunks
                    .first()
                    .map(|c| c.chunk.document_name.clone())
                    .unwrap_or_default(),
                chunk_count: chunks.len(),
            })
            .collect();
        summaries.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(summaries)
    }
}

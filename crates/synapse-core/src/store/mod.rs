//! Vector index abstraction for Synapse.
//!
//! The [`VectorIndex`] trait defines every storage operation the ingestion
//! and retrieval pipeline needs, enabling pluggable backends (SQLite,
//! in-memory). An index owns its embedder: chunk texts and query texts are
//! embedded by the same model inside the index.
//!
//! Implementations must be `Send + Sync` and safe for concurrent reads and
//! for concurrent writes to different documents. Writes to the same
//! document are serialized with [`DocumentLocks`].

pub mod locks;
pub mod memory;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Candidate, DocumentSummary};

pub use locks::DocumentLocks;

/// Abstract vector index.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorIndex::add) | Embed and store all chunks of a document, replacing earlier ones |
/// | [`query`](VectorIndex::query) | Nearest-neighbour search, optionally scoped to one document |
/// | [`remove_document`](VectorIndex::remove_document) | Drop every chunk of a document |
/// | [`documents`](VectorIndex::documents) | List indexed documents with chunk counts |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store `chunks` for a document under ordinals `0..chunks.len()`.
    ///
    /// Re-adding a document replaces all of its chunks. Returns the number
    /// of chunks written; on error nothing is written.
    async fn add(&self, document_id: &str, document_name: &str, chunks: &[String])
        -> Result<usize>;

    /// Return up to `n_results` candidates by ascending distance.
    ///
    /// An empty scope yields an empty vector, not an error.
    async fn query(
        &self,
        query_text: &str,
        n_results: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<Candidate>>;

    /// Remove all chunks of a document, returning how many were removed.
    async fn remove_document(&self, document_id: &str) -> Result<usize>;

    /// List indexed documents, ordered by document id.
    async fn documents(&self) -> Result<Vec<DocumentSummary>>;
}

/// Input checks shared by every [`VectorIndex::add`] implementation.
pub fn validate_add(document_id: &str, chunks: &[String]) -> Result<()> {
    if document_id.trim().is_empty() {
        return Err(Error::validation("document_id must not be empty"));
    }
    if let Some(pos) = chunks.iter().position(|c| c.is_empty()) {
        return Err(Error::validation(format!(
            "chunk {} of document '{}' is empty",
            pos, document_id
        )));
    }
    Ok(())
}

/// Check that an embedder returned one vector per chunk, all the same size.
pub fn validate_vectors(document_id: &str, expected: usize, vectors: &[Vec<f32>]) -> Result<()> {
    if vectors.len() != expected {
        return Err(Error::index_write(
            document_id,
            format!("embedder returned {} vectors for {} chunks", vectors.len(), expected),
        ));
    }
    if let Some(first) = vectors.first() {
        if first.is_empty() || vectors.iter().any(|v| v.len() != first.len()) {
            return Err(Error::index_write(
                document_id,
                "embedder returned empty or mixed-dimension vectors",
            ));
        }
    }
    Ok(())
}

/// Sort candidates by ascending distance (ties by chunk id) and keep `n`.
pub fn rank_by_distance(candidates: &mut Vec<Candidate>, n: usize) {
    candidates.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
    candidates.truncate(n);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn cand(id: &str, distance: f32) -> Candidate {
        Candidate {
            chunk_id: id.to_string(),
            text: String::new(),
            distance,
            metadata: ChunkMetadata::default(),
        }
    }

    #[test]
    fn test_validate_add_rejects_missing_document_id() {
        let err = validate_add("  ", &["a".to_string()]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_add_rejects_empty_chunk() {
        let err = validate_add("d1", &["a".to_string(), String::new()]).unwrap_err();
        assert!(err.to_string().contains("chunk 1"));
    }

    #[test]
    fn test_validate_vectors_count_mismatch() {
        let err = validate_vectors("d1", 2, &[vec![1.0]]).unwrap_err();
        assert!(matches!(err, Error::IndexWrite { .. }));
    }

    #[test]
    fn test_validate_vectors_mixed_dims() {
        let err = validate_vectors("d1", 2, &[vec![1.0], vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, Error::IndexWrite { .. }));
    }

    #[test]
    fn test_rank_by_distance_ties_by_id() {
        let mut c = vec![cand("d::2", 0.5), cand("d::1", 0.5), cand("d::0", 0.1)];
        rank_by_distance(&mut c, 2);
        let ids: Vec<&str> = c.iter().map(|c| c.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["d::0", "d::1"]);
    }
}

//! Core data models shared by the indexing and query paths.
//!
//! Chunks are persisted; candidates and ranked results are produced fresh
//! for every query and never stored.

use serde::{Deserialize, Serialize};

/// Separator between document id and ordinal in a chunk id.
pub const CHUNK_ID_SEPARATOR: &str = "::";

/// Build the stable chunk identifier `"{document_id}::{ordinal}"`.
///
/// ```rust
/// use synapse_core::models::chunk_id;
///
/// assert_eq!(chunk_id("doc-7", 3), "doc-7::3");
/// ```
pub fn chunk_id(document_id: &str, ordinal: usize) -> String {
    format!("{}{}{}", document_id, CHUNK_ID_SEPARATOR, ordinal)
}

/// Split a chunk id back into `(document_id, ordinal)`.
///
/// Splits on the last separator so document ids may themselves contain `::`.
pub fn parse_chunk_id(id: &str) -> Option<(&str, usize)> {
    let (doc, ordinal) = id.rsplit_once(CHUNK_ID_SEPARATOR)?;
    if doc.is_empty() {
        return None;
    }
    ordinal.parse().ok().map(|n| (doc, n))
}

/// Metadata attached to every stored vector.
///
/// Missing fields deserialize to empty string / zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub document_name: String,
    pub chunk_index: usize,
}

/// A bounded span of a document's text, the unit of indexing and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub document_name: String,
    pub ordinal: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(document_id: &str, document_name: &str, ordinal: usize, text: &str) -> Self {
        Self {
            chunk_id: chunk_id(document_id, ordinal),
            document_id: document_id.to_string(),
            document_name: document_name.to_string(),
            ordinal,
            text: text.to_string(),
        }
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            document_id: self.document_id.clone(),
            document_name: self.document_name.clone(),
            chunk_index: self.ordinal,
        }
    }
}

/// A coarse retrieval result before reranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub chunk_id: String,
    pub text: String,
    /// Engine-defined distance; lower is more similar.
    pub distance: f32,
    pub metadata: ChunkMetadata,
}

/// A candidate with its cross-encoder relevance score attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Higher is more relevant.
    pub rerank_score: f32,
}

impl RankedResult {
    pub fn chunk_id(&self) -> &str {
        &self.candidate.chunk_id
    }

    pub fn text(&self) -> &str {
        &self.candidate.text
    }

    pub fn metadata(&self) -> &ChunkMetadata {
        &self.candidate.metadata
    }
}

/// One indexed document and how many chunks it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub document_name: String,
    pub chunk_count: usize,
}

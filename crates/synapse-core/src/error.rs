//! Error taxonomy for the retrieval pipeline.
//!
//! Validation failures are raised before any external call is made.
//! Boundary failures (embedding, vector search, pairwise scoring) wrap the
//! underlying cause so callers can tell an unreachable engine apart from an
//! empty scope, which is never an error.

use thiserror::Error;

/// Boxed cause carried by boundary errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected input: empty query, empty text, missing document id.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Embedding or storage failed while writing a document's chunks.
    #[error("index write failed for document '{document_id}': {source}")]
    IndexWrite {
        document_id: String,
        #[source]
        source: BoxError,
    },

    /// Embedding or search failed while querying the index.
    #[error("index query failed: {source}")]
    IndexQuery {
        #[source]
        source: BoxError,
    },

    /// The pairwise scoring model failed or returned malformed scores.
    #[error("rerank failed: {source}")]
    Rerank {
        #[source]
        source: BoxError,
    },

    /// The segment similarity oracle failed during semantic chunking.
    #[error("chunking failed: {source}")]
    Chunking {
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn index_write(document_id: &str, source: impl Into<BoxError>) -> Self {
        Error::IndexWrite {
            document_id: document_id.to_string(),
            source: source.into(),
        }
    }

    pub fn index_query(source: impl Into<BoxError>) -> Self {
        Error::IndexQuery {
            source: source.into(),
        }
    }

    pub fn rerank(source: impl Into<BoxError>) -> Self {
        Error::Rerank {
            source: source.into(),
        }
    }

    pub fn chunking(source: impl Into<BoxError>) -> Self {
        Error::Chunking {
            source: source.into(),
        }
    }

    /// True for errors caused by the caller's input rather than a backend.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classified() {
        assert!(Error::validation("query must not be empty").is_validation());
        assert!(!Error::rerank(anyhow::anyhow!("boom")).is_validation());
    }

    #[test]
    fn test_boundary_error_keeps_cause() {
        let err = Error::index_write("doc-1", anyhow::anyhow!("connection refused"));
        let msg = err.to_string();
        assert!(msg.contains("doc-1"));
        assert!(msg.contains("connection refused"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

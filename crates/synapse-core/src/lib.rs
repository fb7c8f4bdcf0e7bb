//! # Synapse Core
//!
//! The retrieval-and-reranking pipeline behind Synapse: text normalization,
//! semantic chunking, the vector index abstraction, cross-encoder reranking,
//! and the retrieval orchestrator that composes them.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or other
//! native-only dependencies. External models (embedding, pairwise scoring)
//! are reached through the capability traits in [`embedding`] and
//! [`rerank`], and concrete backends live in the `synapse` app crate.
//!
//! ```text
//! indexing:  raw text ─▶ normalize ─▶ SemanticChunker ─▶ VectorIndex::add
//! querying:  query ─▶ VectorIndex::query (over-fetch) ─▶ Reranker ─▶ top-K
//! ```

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod rerank;
pub mod retrieve;
pub mod store;

pub use error::{Error, Result};
pub use models::{Candidate, Chunk, ChunkMetadata, DocumentSummary, RankedResult};

//! # Synapse
//!
//! Two-stage retrieval for document question answering: semantic chunking
//! on the way in, vector search plus cross-encoder reranking on the way out.
//!
//! The pipeline itself lives in [`synapse_core`]; this crate supplies the
//! SQLite vector index, the embedding and reranking providers, TOML
//! configuration and the `synapse` CLI.
//!
//! ## Architecture
//!
//! ```text
//!  file ──▶ normalize ──▶ chunk ──▶ embed ──▶ ┌──────────┐
//!                                              │  SQLite  │
//!  query ─────────────────────────▶ embed ──▶ │  chunks  │──▶ top N ──▶ rerank ──▶ top K
//!                                              └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! synapse init                          # create database
//! synapse index ./handbook.txt          # chunk, embed and store
//! synapse query "how do refunds work" --top-k 3
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite `VectorIndex` |
//! | [`embedding`] | Embedding providers |
//! | [`rerank`] | Cross-encoder providers |
//! | [`pipeline`] | Component wiring |
//! | [`ingest`] | `index` / `chunk` commands |
//! | [`search`] | `query` command |
//! | [`documents`] | `documents` / `remove` commands |

pub mod config;
pub mod db;
pub mod documents;
pub mod embedding;
pub mod ingest;
#[cfg(feature = "local-models")]
pub mod local_model;
pub mod migrate;
pub mod pipeline;
pub mod rerank;
pub mod search;
pub mod sqlite_store;

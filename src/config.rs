//! TOML configuration for the `synapse` binary.
//!
//! ```toml
//! [db]
//! path = "./data/synapse.sqlite"
//! collection = "synapse_documents"
//!
//! [chunking]
//! max_chars = 900
//! breakpoint = "percentile"
//! breakpoint_amount = 95.0
//!
//! [retrieval]
//! top_k = 5
//!
//! [embedding]
//! provider = "local"
//! model = "bge-small-en-v1.5"
//!
//! [reranker]
//! provider = "local"
//! model = "bge-reranker-base"
//! ```
//!
//! Every section except `[db]` may be omitted. Use [`load_config`] to read
//! and validate a file; it rejects out-of-range values before any command
//! runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use synapse_core::chunk::{BreakpointStrategy, DEFAULT_MAX_CHARS};
use synapse_core::embedding::DistanceMetric;
use synapse_core::retrieve::RetrievalParams;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reranker: RerankerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_collection() -> String {
    "synapse_documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// `percentile`, `standard_deviation` or `interquartile`.
    #[serde(default = "default_breakpoint")]
    pub breakpoint: String,
    /// Defaults to 95 for percentile, 3 for standard deviation and 1.5 for
    /// interquartile.
    #[serde(default)]
    pub breakpoint_amount: Option<f32>,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            breakpoint: default_breakpoint(),
            breakpoint_amount: None,
            buffer_size: default_buffer_size(),
        }
    }
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}
fn default_breakpoint() -> String {
    "percentile".to_string()
}
fn default_buffer_size() -> usize {
    1
}

impl ChunkingConfig {
    /// Resolve `breakpoint` and `breakpoint_amount` into a strategy.
    pub fn strategy(&self) -> Result<BreakpointStrategy> {
        let strategy = match self.breakpoint.as_str() {
            "percentile" => BreakpointStrategy::Percentile(self.breakpoint_amount.unwrap_or(95.0)),
            "standard_deviation" => {
                BreakpointStrategy::StandardDeviation(self.breakpoint_amount.unwrap_or(3.0))
            }
            "interquartile" => {
                BreakpointStrategy::Interquartile(self.breakpoint_amount.unwrap_or(1.5))
            }
            other => anyhow::bail!(
                "Unknown chunking.breakpoint: '{}'. Must be percentile, standard_deviation, or interquartile.",
                other
            ),
        };
        Ok(strategy)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: i64,
    #[serde(default = "default_overfetch_factor")]
    pub overfetch_factor: i64,
    #[serde(default = "default_min_candidates")]
    pub min_candidates: i64,
    #[serde(default)]
    pub distance: DistanceMetric,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            overfetch_factor: default_overfetch_factor(),
            min_candidates: default_min_candidates(),
            distance: DistanceMetric::default(),
        }
    }
}

fn default_top_k() -> i64 {
    5
}
fn default_overfetch_factor() -> i64 {
    3
}
fn default_min_candidates() -> i64 {
    15
}

impl RetrievalConfig {
    pub fn params(&self) -> RetrievalParams {
        RetrievalParams {
            overfetch_factor: self.overfetch_factor,
            min_candidates: self.min_candidates,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for `ollama` (default `http://localhost:11434`).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RerankerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible `/v1/rerank` server (`http` provider).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_rerank_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            batch_size: default_rerank_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rerank_batch_size() -> usize {
    32
}

impl Config {
    /// In-code defaults with everything external disabled.
    ///
    /// Used by commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/synapse.sqlite"),
                collection: default_collection(),
            },
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            reranker: RerankerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Range and consistency checks applied by [`load_config`].
pub fn validate(config: &Config) -> Result<()> {
    if config.db.collection.trim().is_empty() {
        anyhow::bail!("db.collection must not be empty");
    }

    // Validate chunking
    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }
    match config.chunking.strategy()? {
        BreakpointStrategy::Percentile(p) if !(0.0..=100.0).contains(&p) => {
            anyhow::bail!("chunking.breakpoint_amount must be in [0, 100] for percentile");
        }
        BreakpointStrategy::StandardDeviation(k) | BreakpointStrategy::Interquartile(k)
            if k < 0.0 || k.is_nan() =>
        {
            anyhow::bail!("chunking.breakpoint_amount must be >= 0");
        }
        _ => {}
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if config.retrieval.overfetch_factor < 1 {
        anyhow::bail!("retrieval.overfetch_factor must be >= 1");
    }
    if config.retrieval.min_candidates < 1 {
        anyhow::bail!("retrieval.min_candidates must be >= 1");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
            if config.embedding.dims == Some(0) {
                anyhow::bail!("embedding.dims must be > 0");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }
    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    // Validate reranker
    match config.reranker.provider.as_str() {
        "disabled" | "local" => {}
        "http" => {
            if config.reranker.url.is_none() {
                anyhow::bail!("reranker.url must be specified when provider is 'http'");
            }
        }
        other => anyhow::bail!(
            "Unknown reranker provider: '{}'. Must be disabled, local, or http.",
            other
        ),
    }
    if config.reranker.batch_size == 0 {
        anyhow::bail!("reranker.batch_size must be > 0");
    }

    Ok(())
}

//! `synapse index` and `synapse chunk`: the indexing path from a file on disk.
//!
//! Files are read as bytes and decoded as UTF-8, replacing invalid
//! sequences. No format detection is attempted.

use anyhow::{Context, Result};
use std::path::Path;
use uuid::Uuid;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::pipeline::{build_chunker, Pipeline};

/// Read `path` as lossy UTF-8 text.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn default_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run_index(
    config: &Config,
    path: &Path,
    id: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let text = read_text(path)?;
    let document_id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let document_name = name.unwrap_or_else(|| default_name(path));

    let pipeline = Pipeline::open(config).await?;
    let result = pipeline
        .ingestor
        .ingest(&document_id, &document_name, &text)
        .await;
    pipeline.close().await;
    let report = result.with_context(|| format!("Failed to index {}", path.display()))?;

    println!("index {}", path.display());
    println!("  document_id: {}", report.document_id);
    println!("  name: {}", document_name);
    println!("  chunks written: {}", report.chunk_count);
    println!("ok");
    Ok(())
}

/// Print the chunks `path` would produce, without touching the index.
pub async fn run_chunk(config: &Config, path: &Path, max_chars: Option<usize>) -> Result<()> {
    let text = read_text(path)?;
    let embedder = create_embedder(&config.embedding)?;
    let chunker = build_chunker(
        config,
        embedder,
        max_chars.unwrap_or(config.chunking.max_chars),
    )?;

    let chunks = chunker.chunk(&text).await?;
    if chunks.is_empty() {
        println!("No chunks (no readable text).");
        return Ok(());
    }

    for (i, chunk) in chunks.iter().enumerate() {
        println!("[chunk {}] ({} chars)", i, chunk.chars().count());
        println!("{}", chunk);
        println!();
    }
    println!("total chunks: {}", chunks.len());
    Ok(())
}

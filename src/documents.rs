//! `synapse documents` and `synapse remove`.

use anyhow::Result;

use synapse_core::store::VectorIndex;

use crate::config::Config;
use crate::pipeline::Pipeline;

pub async fn run_documents(config: &Config) -> Result<()> {
    let pipeline = Pipeline::open(config).await?;
    let listing = pipeline.index.list_documents().await;
    pipeline.close().await;
    let listing = listing?;

    if listing.is_empty() {
        println!("No documents indexed.");
        return Ok(());
    }

    println!(
        "{:<38} {:>6}  {:<20}  NAME",
        "DOCUMENT_ID", "CHUNKS", "INDEXED_AT"
    );
    for row in &listing {
        println!(
            "{:<38} {:>6}  {:<20}  {}",
            row.summary.document_id, row.summary.chunk_count, row.indexed_at, row.summary.document_name
        );
    }
    Ok(())
}

pub async fn run_remove(config: &Config, document_id: &str) -> Result<()> {
    let pipeline = Pipeline::open(config).await?;
    let removed = pipeline.index.remove_document(document_id).await;
    pipeline.close().await;
    let removed = removed?;

    if removed == 0 {
        println!("No chunks found for document {}.", document_id);
    } else {
        println!("Removed {} chunks of document {}.", removed, document_id);
    }
    Ok(())
}

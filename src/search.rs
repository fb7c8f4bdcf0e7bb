//! `synapse query`: two-stage retrieval from the command line.

use anyhow::Result;

use synapse_core::RankedResult;

use crate::config::Config;
use crate::pipeline::Pipeline;

pub async fn run_query(
    config: &Config,
    query: &str,
    top_k: Option<i64>,
    document: Option<String>,
    json: bool,
) -> Result<()> {
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let pipeline = Pipeline::open(config).await?;
    let result = pipeline
        .retriever
        .retrieve(query, top_k, document.as_deref())
        .await;
    pipeline.close().await;
    let results = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_results(&results);
    Ok(())
}

fn print_results(results: &[RankedResult]) {
    for (i, result) in results.iter().enumerate() {
        let meta = result.metadata();
        let name = if meta.document_name.is_empty() {
            "(unnamed)"
        } else {
            meta.document_name.as_str()
        };

        println!(
            "{}. [{:.3}] {} (chunk {})",
            i + 1,
            result.rerank_score,
            name,
            meta.chunk_index
        );
        println!("    distance: {:.4}", result.candidate.distance);
        println!("    excerpt: \"{}\"", excerpt(result.text(), 240));
        println!("    id: {}", result.chunk_id());
        println!();
    }
}

/// First `max_chars` characters of `text` on a single line.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_flattens_and_truncates() {
        assert_eq!(excerpt("a\nb", 10), "a b");
        assert_eq!(excerpt("héllo world", 5), "héllo…");
        assert_eq!(excerpt("  padded  ", 20), "padded");
    }
}

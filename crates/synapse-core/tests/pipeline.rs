//! End-to-end tests for the ingestion and retrieval pipeline using the
//! in-memory index and deterministic fake models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::executor::block_on;

use synapse_core::chunk::{NoBoundaries, SemanticChunker};
use synapse_core::embedding::Embedder;
use synapse_core::ingest::Ingestor;
use synapse_core::rerank::{PairScorer, Reranker};
use synapse_core::retrieve::Retriever;
use synapse_core::store::memory::InMemoryIndex;
use synapse_core::store::VectorIndex;
use synapse_core::{Candidate, DocumentSummary, Error};

/// Byte histogram over a few buckets; stable and cheap.
struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }
    fn dims(&self) -> usize {
        8
    }
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.01f32; 8];
                for b in t.bytes() {
                    v[(b % 8) as usize] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Scores 1.0 when the text occurs verbatim in the query, else 0.0.
struct ContainsScorer {
    calls: AtomicUsize,
}

impl ContainsScorer {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PairScorer for ContainsScorer {
    fn model_name(&self) -> &str {
        "contains"
    }
    async fn score_batch(&self, pairs: &[(&str, &str)]) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pairs
            .iter()
            .map(|(q, t)| if q.split_whitespace().any(|w| w == *t) { 1.0 } else { 0.0 })
            .collect())
    }
}

struct BrokenScorer;

#[async_trait]
impl PairScorer for BrokenScorer {
    fn model_name(&self) -> &str {
        "broken"
    }
    async fn score_batch(&self, _pairs: &[(&str, &str)]) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("connection refused")
    }
}

/// Counts query calls and returns a fixed candidate list.
struct CountingIndex {
    queries: AtomicUsize,
    last_n: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn add(&self, _d: &str, _n: &str, chunks: &[String]) -> synapse_core::Result<usize> {
        Ok(chunks.len())
    }
    async fn query(
        &self,
        _q: &str,
        n_results: usize,
        _d: Option<&str>,
    ) -> synapse_core::Result<Vec<Candidate>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.last_n.store(n_results, Ordering::SeqCst);
        Ok(Vec::new())
    }
    async fn remove_document(&self, _d: &str) -> synapse_core::Result<usize> {
        Ok(0)
    }
    async fn documents(&self) -> synapse_core::Result<Vec<DocumentSummary>> {
        Ok(Vec::new())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_find_b_scenario() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashEmbedder::new())));
    block_on(index.add("doc", "abc.txt", &strings(&["A", "B", "C"]))).unwrap();

    let scorer = Arc::new(ContainsScorer::new());
    let retriever = Retriever::new(index, Reranker::new(scorer.clone()));

    assert_eq!(retriever.params().candidate_count(1), 15);
    let results = block_on(retriever.retrieve("find B", 1, None)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text(), "B");
    assert_eq!(results[0].chunk_id(), "doc::1");
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_empty_query_touches_nothing() {
    let index = Arc::new(CountingIndex {
        queries: AtomicUsize::new(0),
        last_n: AtomicUsize::new(0),
    });
    let scorer = Arc::new(ContainsScorer::new());
    let retriever = Retriever::new(index.clone(), Reranker::new(scorer.clone()));

    for q in ["", "   ", "\n\t"] {
        let err = block_on(retriever.retrieve(q, 5, None)).unwrap_err();
        assert!(err.is_validation());
    }
    assert_eq!(index.queries.load(Ordering::SeqCst), 0);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_retrieve_overfetches() {
    let index = Arc::new(CountingIndex {
        queries: AtomicUsize::new(0),
        last_n: AtomicUsize::new(0),
    });
    let retriever = Retriever::new(index.clone(), Reranker::new(Arc::new(ContainsScorer::new())));

    block_on(retriever.retrieve("q", 10, None)).unwrap();
    assert_eq!(index.last_n.load(Ordering::SeqCst), 30);
    block_on(retriever.retrieve("q", 2, None)).unwrap();
    assert_eq!(index.last_n.load(Ordering::SeqCst), 15);
}

#[test]
fn test_non_positive_top_k_skips_index_and_scorer() {
    let index = Arc::new(CountingIndex {
        queries: AtomicUsize::new(0),
        last_n: AtomicUsize::new(0),
    });
    let scorer = Arc::new(ContainsScorer::new());
    let retriever = Retriever::new(index.clone(), Reranker::new(scorer.clone()));

    for top_k in [0, -1, i64::MIN] {
        assert!(block_on(retriever.retrieve("refunds", top_k, None))
            .unwrap()
            .is_empty());
    }
    assert_eq!(index.queries.load(Ordering::SeqCst), 0);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);

    // The query text is still validated first.
    assert!(block_on(retriever.retrieve(" ", 0, None))
        .unwrap_err()
        .is_validation());
}

#[test]
fn test_rerank_failure_fails_retrieval() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashEmbedder::new())));
    block_on(index.add("doc", "d", &strings(&["A", "B"]))).unwrap();
    let retriever = Retriever::new(index, Reranker::new(Arc::new(BrokenScorer)));

    let err = block_on(retriever.retrieve("find B", 1, None)).unwrap_err();
    assert!(matches!(err, Error::Rerank { .. }));
}

#[test]
fn test_document_scope_is_respected() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashEmbedder::new())));
    block_on(index.add("one", "1.txt", &strings(&["A", "B"]))).unwrap();
    block_on(index.add("two", "2.txt", &strings(&["B", "C"]))).unwrap();
    let retriever = Retriever::new(index, Reranker::new(Arc::new(ContainsScorer::new())));

    let results = block_on(retriever.retrieve("find B", 5, Some("two"))).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.metadata().document_id == "two"));
    assert_eq!(results[0].chunk_id(), "two::0");
}

#[test]
fn test_unknown_document_yields_empty_results() {
    let embedder = Arc::new(HashEmbedder::new());
    let index = Arc::new(InMemoryIndex::new(embedder.clone()));
    let scorer = Arc::new(ContainsScorer::new());
    let retriever = Retriever::new(index, Reranker::new(scorer.clone()));

    let results = block_on(retriever.retrieve("find B", 5, Some("ghost"))).unwrap();
    assert!(results.is_empty());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_ingest_then_retrieve() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashEmbedder::new())));
    let chunker = SemanticChunker::new(900, Arc::new(NoBoundaries));
    let ingestor = Ingestor::new(chunker, index.clone());

    let long = "x".repeat(2500);
    let report = block_on(ingestor.ingest("long", "long.txt", &long)).unwrap();
    assert_eq!(report.chunk_count, 3);

    let docs = block_on(index.documents()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].document_name, "long.txt");
    assert_eq!(docs[0].chunk_count, 3);

    let retriever = Retriever::new(index, Reranker::new(Arc::new(ContainsScorer::new())));
    let results = block_on(retriever.retrieve("anything", 5, Some("long"))).unwrap();
    assert_eq!(results.len(), 3);
    let total: usize = results.iter().map(|r| r.text().chars().count()).sum();
    assert_eq!(total, 2500);
}

#[test]
fn test_reingest_replaces_previous_chunks() {
    let index = Arc::new(InMemoryIndex::new(Arc::new(HashEmbedder::new())));
    let ingestor = Ingestor::new(SemanticChunker::new(5, Arc::new(NoBoundaries)), index.clone());

    block_on(ingestor.ingest("doc", "v1", "aaaaabbbbbccccc")).unwrap();
    block_on(ingestor.ingest("doc", "v2", "dddd")).unwrap();

    let docs = block_on(index.documents()).unwrap();
    assert_eq!(docs[0].chunk_count, 1);
    assert_eq!(index.len(), 1);
}

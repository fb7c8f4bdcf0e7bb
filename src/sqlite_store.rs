//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Chunks of one named collection live in the `chunks` table, keyed by
//! `(collection, chunk_id)`. Each row carries its metadata as JSON and its
//! embedding as a BLOB (see [`vec_to_blob`]). Search is brute-force cosine
//! or squared-L2 over the rows in scope.
//!
//! Writes for a document run in a single transaction: the previous chunks
//! are deleted and the new ones inserted, so readers see either the old or
//! the new version, never a mix.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use synapse_core::embedding::{blob_to_vec, vec_to_blob, DistanceMetric, Embedder};
use synapse_core::models::chunk_id;
use synapse_core::store::{
    rank_by_distance, validate_add, validate_vectors, DocumentLocks, VectorIndex,
};
use synapse_core::{Candidate, ChunkMetadata, DocumentSummary, Error, Result};

/// SQLite implementation of the [`VectorIndex`] trait.
pub struct SqliteIndex {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn Embedder>,
    metric: DistanceMetric,
    write_locks: DocumentLocks,
}

/// A document listing row with the time it was last indexed.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentListing {
    #[serde(flatten)]
    pub summary: DocumentSummary,
    pub indexed_at: String,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool, collection: &str, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
            embedder,
            metric: DistanceMetric::default(),
            write_locks: DocumentLocks::new(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Indexed documents with their chunk counts and last index time.
    pub async fn list_documents(&self) -> Result<Vec<DocumentListing>> {
        let rows = sqlx::query(
            r#"
            SELECT document_id,
                   COUNT(*) AS chunk_count,
                   MAX(CASE WHEN chunk_index = 0 THEN metadata_json END) AS first_meta,
                   MAX(indexed_at) AS indexed_at
            FROM chunks
            WHERE collection = ?
            GROUP BY document_id
            ORDER BY document_id
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::index_query)?;

        Ok(rows
            .iter()
            .map(|row| {
                let document_id: String = row.get("document_id");
                let meta = parse_metadata(
                    row.get::<Option<String>, _>("first_meta").as_deref(),
                    &document_id,
                    0,
                );
                DocumentListing {
                    summary: DocumentSummary {
                        document_id,
                        document_name: meta.document_name,
                        chunk_count: row.get::<i64, _>("chunk_count") as usize,
                    },
                    indexed_at: format_ts_iso(row.get("indexed_at")),
                }
            })
            .collect())
    }

    async fn count_in_scope(&self, document_id: Option<&str>) -> Result<i64> {
        let count: i64 = match document_id {
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM chunks WHERE collection = ? AND document_id = ?",
                )
                .bind(&self.collection)
                .bind(id)
                .fetch_one(&self.pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM chunks WHERE collection = ?")
                    .bind(&self.collection)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(Error::index_query)?;
        Ok(count)
    }
}

/// Metadata read field by field.
///
/// An absent or mistyped field falls back to the row's own column
/// (`document_id`, `chunk_index`), or to `""` for `document_name`.
fn parse_metadata(json: Option<&str>, document_id: &str, chunk_index: usize) -> ChunkMetadata {
    let value = match json.map(serde_json::from_str::<serde_json::Value>) {
        Some(Ok(value)) => value,
        Some(Err(e)) => {
            tracing::warn!(document_id, error = %e, "unreadable chunk metadata, using row columns");
            serde_json::Value::Null
        }
        None => serde_json::Value::Null,
    };
    let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);

    ChunkMetadata {
        document_id: text("document_id").unwrap_or_else(|| document_id.to_string()),
        document_name: text("document_name").unwrap_or_default(),
        chunk_index: value
            .get("chunk_index")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(chunk_index),
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn add(
        &self,
        document_id: &str,
        document_name: &str,
        chunks: &[String],
    ) -> Result<usize> {
        validate_add(document_id, chunks)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let _guard = self.write_locks.lock(document_id).await;

        let vectors = self
            .embedder
            .embed(chunks)
            .await
            .map_err(|e| Error::index_write(document_id, e))?;
        validate_vectors(document_id, chunks.len(), &vectors)?;

        let write_err = |e: sqlx::Error| Error::index_write(document_id, e);
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await.map_err(write_err)?;

        sqlx::query("DELETE FROM chunks WHERE collection = ? AND document_id = ?")
            .bind(&self.collection)
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;

        for (i, (text, vector)) in chunks.iter().zip(&vectors).enumerate() {
            let metadata = ChunkMetadata {
                document_id: document_id.to_string(),
                document_name: document_name.to_string(),
                chunk_index: i,
            };
            let metadata_json = serde_json::to_string(&metadata)
                .map_err(|e| Error::index_write(document_id, e))?;

            sqlx::query(
                r#"
                INSERT INTO chunks (collection, chunk_id, document_id, chunk_index, text,
                                    metadata_json, embedding, model, indexed_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&self.collection)
            .bind(chunk_id(document_id, i))
            .bind(document_id)
            .bind(i as i64)
            .bind(text)
            .bind(&metadata_json)
            .bind(vec_to_blob(vector))
            .bind(self.embedder.model_name())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        }

        tx.commit().await.map_err(write_err)?;

        tracing::info!(
            collection = %self.collection,
            document_id,
            chunks = chunks.len(),
            "indexed document"
        );
        Ok(chunks.len())
    }

    async fn query(
        &self,
        query_text: &str,
        n_results: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<Candidate>> {
        if n_results == 0 || self.count_in_scope(document_id).await? == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self
            .embedder
            .embed_one(query_text)
            .await
            .map_err(Error::index_query)?;

        let rows = match document_id {
            Some(id) => {
                sqlx::query(
                    r#"
                    SELECT chunk_id, document_id, chunk_index, text, metadata_json, embedding, model
                    FROM chunks
                    WHERE collection = ? AND document_id = ?
                    "#,
                )
                .bind(&self.collection)
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT chunk_id, document_id, chunk_index, text, metadata_json, embedding, model
                    FROM chunks
                    WHERE collection = ?
                    "#,
                )
                .bind(&self.collection)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::index_query)?;

        let current_model = self.embedder.model_name();
        let mut other_model_rows = 0usize;
        let mut candidates = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk_id: String = row.get("chunk_id");
            let stored = blob_to_vec(&row.get::<Vec<u8>, _>("embedding"));
            if stored.len() != query_vec.len() {
                return Err(Error::index_query(format!(
                    "chunk '{}' has a {}-dimensional embedding but the query has {}; \
                     re-index with the current embedding model",
                    chunk_id,
                    stored.len(),
                    query_vec.len()
                )));
            }
            if row.get::<String, _>("model") != current_model {
                other_model_rows += 1;
            }

            let document_id: String = row.get("document_id");
            let chunk_index = row.get::<i64, _>("chunk_index") as usize;
            let metadata_json: String = row.get("metadata_json");
            candidates.push(Candidate {
                chunk_id,
                text: row.get("text"),
                distance: self.metric.distance(&query_vec, &stored),
                metadata: parse_metadata(Some(&metadata_json), &document_id, chunk_index),
            });
        }

        if other_model_rows > 0 {
            tracing::warn!(
                collection = %self.collection,
                rows = other_model_rows,
                model = current_model,
                "chunks were embedded with a different model"
            );
        }

        rank_by_distance(&mut candidates, n_results);
        Ok(candidates)
    }

    async fn remove_document(&self, document_id: &str) -> Result<usize> {
        let _guard = self.write_locks.lock(document_id).await;

        let result = sqlx::query("DELETE FROM chunks WHERE collection = ? AND document_id = ?")
            .bind(&self.collection)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::index_write(document_id, e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self
            .list_documents()
            .await?
            .into_iter()
            .map(|l| l.summary)
            .collect())
    }
}

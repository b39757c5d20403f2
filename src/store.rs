//! The retrieval store: documents, chunks, and similarity search.
//!
//! Owns the only persisted state in the runtime — the `documents` and
//! `chunks` tables — and everything between raw text and ranked hits:
//! deterministic document ids, overlapping chunking, per-chunk embedding,
//! and brute-force cosine search over a dataset.
//!
//! The full-scan query is deliberate: datasets here are single-user,
//! single-machine sized, and the scan lives entirely behind
//! [`RetrievalStore::query`], so an indexed nearest-neighbor structure
//! could replace it later without touching the public contract.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

use crate::chunk::chunk_text;
use crate::config::ChunkingConfig;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use crate::models::{DatasetInfo, Document, DocumentSummary, RetrievalHit};

/// How many leading characters of content participate in the document id.
///
/// Enough to distinguish real edits; bounded so huge documents don't pay
/// for a full-content hash on every ingest.
const ID_CONTENT_PREFIX_CHARS: usize = 256;

/// Deterministic document id: `sha256(dataset, filename, content prefix)`.
///
/// Re-adding identical content to the same `(dataset, filename)` slot
/// yields the same id, which makes ingestion idempotent (overwrite, not
/// duplicate).
pub fn document_id(dataset: &str, filename: &str, content: &str) -> String {
    let prefix_end = content
        .char_indices()
        .nth(ID_CONTENT_PREFIX_CHARS)
        .map(|(pos, _)| pos)
        .unwrap_or(content.len());

    let mut hasher = Sha256::new();
    hasher.update(dataset.as_bytes());
    hasher.update(b"\0");
    hasher.update(filename.as_bytes());
    hasher.update(b"\0");
    hasher.update(content[..prefix_end].as_bytes());
    format!("{:x}", hasher.finalize())
}

/// SQLite-backed store over documents and their embedded chunks.
pub struct RetrievalStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl RetrievalStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self {
            pool,
            embedder,
            chunking,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Ingest one document: compute its id, chunk, embed each chunk, and
    /// persist document + chunk rows. Returns the document id.
    ///
    /// Embedding is synchronous per chunk — one round-trip each. Chunk
    /// rows for a previous version of the document are replaced in the
    /// same transaction as the new inserts, so a failed embed leaves the
    /// old rows intact.
    pub async fn add_document(
        &self,
        dataset: &str,
        filename: &str,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<String> {
        if dataset.trim().is_empty() {
            bail!("dataset name must not be empty");
        }
        if filename.trim().is_empty() {
            bail!("filename must not be empty");
        }

        let doc_id = document_id(dataset, filename, content);
        let now = chrono::Utc::now().timestamp();
        let metadata_json = serde_json::to_string(metadata)?;

        let chunks = chunk_text(
            &doc_id,
            content,
            self.chunking.chunk_size,
            self.chunking.overlap,
        );

        // Embed before opening the transaction; a provider failure here
        // must not leave a document without chunks.
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = self.embedder.embed(&chunk.text).await?;
            vectors.push(vector);
        }

        let mut tx = self.pool.begin().await?;

        // A different edit of the same (dataset, filename) has a different
        // id; drop the stale document first so the pair stays unique.
        sqlx::query(
            "DELETE FROM chunks WHERE document_id IN \
             (SELECT id FROM documents WHERE dataset = ? AND filename = ? AND id != ?)",
        )
        .bind(dataset)
        .bind(filename)
        .bind(&doc_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM documents WHERE dataset = ? AND filename = ? AND id != ?")
            .bind(dataset)
            .bind(filename)
            .bind(&doc_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, dataset, filename, content, metadata_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                content = excluded.content,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&doc_id)
        .bind(dataset)
        .bind(filename)
        .bind(content)
        .bind(&metadata_json)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&doc_id)
            .execute(&mut *tx)
            .await?;

        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, embedding) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(dataset, filename, chunks = chunks.len(), "document ingested");
        Ok(doc_id)
    }

    /// Similarity search within one dataset.
    ///
    /// Embeds the question once, scans every chunk of the dataset,
    /// scores by cosine similarity, and returns the best `top_k` in
    /// non-increasing order. An empty dataset yields an empty vec.
    pub async fn query(
        &self,
        dataset: &str,
        question: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT c.id AS chunk_id, c.document_id, c.text, c.embedding,
                   d.filename, d.metadata_json
            FROM chunks c
            JOIN documents d ON d.id = c.document_id
            WHERE d.dataset = ?
            "#,
        )
        .bind(dataset)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let question_vec = self.embedder.embed(question).await?;

        let mut hits: Vec<RetrievalHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                let similarity = cosine_similarity(&question_vec, &vector);
                let metadata_json: String = row.get("metadata_json");
                let metadata: serde_json::Value =
                    serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({}));

                RetrievalHit {
                    chunk_id: row.get("chunk_id"),
                    document_id: row.get("document_id"),
                    filename: row.get("filename"),
                    content: row.get("text"),
                    metadata,
                    similarity,
                }
            })
            .collect();

        // Sort: similarity desc, chunk_id asc (deterministic)
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Fetch one document by id.
    pub async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, dataset, filename, content, metadata_json, created_at, updated_at \
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Document {
            id: row.get("id"),
            dataset: row.get("dataset"),
            filename: row.get("filename"),
            content: row.get("content"),
            metadata_json: row.get("metadata_json"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    /// Delete one document and its chunks. Returns true if it existed.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every document in a dataset. Returns the document count removed.
    pub async fn delete_dataset(&self, dataset: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chunks WHERE document_id IN (SELECT id FROM documents WHERE dataset = ?)",
        )
        .bind(dataset)
        .execute(&mut *tx)
        .await?;
        let result = sqlx::query("DELETE FROM documents WHERE dataset = ?")
            .bind(dataset)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Aggregate counts and document listing for one dataset.
    pub async fn dataset_info(&self, dataset: &str) -> Result<DatasetInfo> {
        let document_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE dataset = ?")
                .bind(dataset)
                .fetch_one(&self.pool)
                .await?;

        let chunk_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunks WHERE document_id IN \
             (SELECT id FROM documents WHERE dataset = ?)",
        )
        .bind(dataset)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            "SELECT id, filename, created_at FROM documents WHERE dataset = ? ORDER BY created_at ASC, filename ASC",
        )
        .bind(dataset)
        .fetch_all(&self.pool)
        .await?;

        let documents = rows
            .iter()
            .map(|row| {
                let created_at: i64 = row.get("created_at");
                DocumentSummary {
                    id: row.get("id"),
                    filename: row.get("filename"),
                    created_at: format_ts_iso(created_at),
                }
            })
            .collect();

        Ok(DatasetInfo {
            dataset: dataset.to_string(),
            document_count,
            chunk_count,
            documents,
        })
    }

    /// All dataset names with their document counts.
    pub async fn list_datasets(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT dataset, COUNT(*) AS doc_count FROM documents GROUP BY dataset ORDER BY dataset ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("dataset"), row.get("doc_count")))
            .collect())
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

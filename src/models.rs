//! Core data models for the retrieval store.
//!
//! These types represent documents, chunks, and retrieval hits that flow
//! through the ingestion and query pipeline. Plan and step types live in
//! [`crate::plan`]; they are transient and never persisted.

use serde::Serialize;

/// Normalized document stored in SQLite.
///
/// `id` is a deterministic hash of `(dataset, filename, content prefix)`,
/// so re-adding identical content overwrites instead of duplicating.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub dataset: String,
    pub filename: String,
    pub content: String,
    pub metadata_json: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A bounded-length slice of a document's text, the unit of embedding.
///
/// Chunk lifetime is bound to the parent document (cascade delete).
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
}

/// One similarity-search result from [`crate::store::RetrievalStore::query`].
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalHit {
    pub chunk_id: String,
    pub document_id: String,
    pub filename: String,
    pub content: String,
    pub metadata: serde_json::Value,
    pub similarity: f32,
}

/// Summary row in a [`DatasetInfo`] listing.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub created_at: String, // ISO8601
}

/// Aggregate view of one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub dataset: String,
    pub document_count: i64,
    pub chunk_count: i64,
    pub documents: Vec<DocumentSummary>,
}

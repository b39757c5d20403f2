//! Integration tests for the retrieval store: ingestion, similarity
//! search, and dataset lifecycle against a real SQLite database.

mod common;

use common::{test_pool, test_store};
use serde_json::json;
use sidekick::config::ChunkingConfig;
use sidekick::embedding::DisabledEmbedder;
use sidekick::store::{document_id, RetrievalStore};
use sqlx::Row;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn query_ranks_similar_documents_first() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    store
        .add_document(
            "knowledge",
            "rust.md",
            "Rust notes. Rust has ownership. Rust uses cargo.",
            &json!({}),
        )
        .await
        .unwrap();
    store
        .add_document(
            "knowledge",
            "python.md",
            "Python notes. Python uses pip and virtualenvs.",
            &json!({}),
        )
        .await
        .unwrap();

    let hits = store
        .query("knowledge", "tell me about rust", 5)
        .await
        .unwrap();

    assert!(!hits.is_empty());
    assert_eq!(hits[0].filename, "rust.md");
    for hit in &hits {
        assert!(hit.similarity >= -1.0 && hit.similarity <= 1.0);
    }
    // Non-increasing order
    for pair in hits.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test]
async fn query_respects_top_k() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    for i in 0..4 {
        store
            .add_document(
                "knowledge",
                &format!("doc{}.md", i),
                &format!("cloud deployment notes number {}", i),
                &json!({}),
            )
            .await
            .unwrap();
    }

    let hits = store.query("knowledge", "cloud", 2).await.unwrap();
    assert_eq!(hits.len(), 2);

    let none = store.query("knowledge", "cloud", 0).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn query_against_missing_dataset_is_empty_without_embedding() {
    let tmp = TempDir::new().unwrap();
    let pool = test_pool(&tmp).await;
    // A disabled embedder fails on any embed call, so an empty result
    // here proves the store never embeds when there is nothing to scan.
    let store = RetrievalStore::new(
        pool,
        Arc::new(DisabledEmbedder),
        ChunkingConfig {
            chunk_size: 200,
            overlap: 40,
        },
    );

    let hits = store.query("nope", "anything", 5).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn re_adding_identical_content_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let pool = test_pool(&tmp).await;
    let store = test_store(pool.clone());

    let id1 = store
        .add_document("knowledge", "a.md", "same text about rust", &json!({}))
        .await
        .unwrap();
    let id2 = store
        .add_document("knowledge", "a.md", "same text about rust", &json!({}))
        .await
        .unwrap();
    assert_eq!(id1, id2);
    assert_eq!(id1, document_id("knowledge", "a.md", "same text about rust"));

    let docs: i64 = sqlx::query("SELECT COUNT(*) AS n FROM documents")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(docs, 1);

    let chunks: i64 = sqlx::query("SELECT COUNT(*) AS n FROM chunks")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(chunks, 1);
}

#[tokio::test]
async fn editing_content_replaces_the_old_document() {
    let tmp = TempDir::new().unwrap();
    let pool = test_pool(&tmp).await;
    let store = test_store(pool.clone());

    let old_id = store
        .add_document("knowledge", "a.md", "first version", &json!({}))
        .await
        .unwrap();
    let new_id = store
        .add_document("knowledge", "a.md", "second version", &json!({}))
        .await
        .unwrap();
    assert_ne!(old_id, new_id);

    // Only the new row remains for the (dataset, filename) pair.
    let rows = sqlx::query("SELECT id FROM documents WHERE dataset = 'knowledge'")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let kept: String = rows[0].get("id");
    assert_eq!(kept, new_id);

    let orphans: i64 =
        sqlx::query("SELECT COUNT(*) AS n FROM chunks WHERE document_id = ?")
            .bind(&old_id)
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("n");
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn get_document_returns_the_full_row() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    let id = store
        .add_document("knowledge", "a.md", "rust text", &json!({ "source": "mail" }))
        .await
        .unwrap();

    let doc = store.get_document(&id).await.unwrap().unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.dataset, "knowledge");
    assert_eq!(doc.filename, "a.md");
    assert_eq!(doc.content, "rust text");
    assert!(doc.metadata_json.contains("mail"));
    assert!(doc.created_at > 0);

    assert!(store.get_document("no-such-id").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_document_removes_its_chunks() {
    let tmp = TempDir::new().unwrap();
    let pool = test_pool(&tmp).await;
    let store = test_store(pool.clone());

    let id = store
        .add_document("knowledge", "a.md", "rust rust rust", &json!({}))
        .await
        .unwrap();

    assert!(store.delete_document(&id).await.unwrap());
    assert!(!store.delete_document(&id).await.unwrap());

    let chunks: i64 = sqlx::query("SELECT COUNT(*) AS n FROM chunks")
        .fetch_one(&pool)
        .await
        .unwrap()
        .get("n");
    assert_eq!(chunks, 0);
}

#[tokio::test]
async fn delete_dataset_leaves_other_datasets_alone() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    store
        .add_document("scratch", "a.md", "one", &json!({}))
        .await
        .unwrap();
    store
        .add_document("scratch", "b.md", "two", &json!({}))
        .await
        .unwrap();
    store
        .add_document("knowledge", "keep.md", "three", &json!({}))
        .await
        .unwrap();

    let removed = store.delete_dataset("scratch").await.unwrap();
    assert_eq!(removed, 2);

    let info = store.dataset_info("knowledge").await.unwrap();
    assert_eq!(info.document_count, 1);

    let gone = store.dataset_info("scratch").await.unwrap();
    assert_eq!(gone.document_count, 0);
    assert_eq!(gone.chunk_count, 0);
}

#[tokio::test]
async fn dataset_info_and_listing_report_counts() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    // Long enough to split into several chunks at chunk_size 200.
    let long_text = "rust ".repeat(120);
    store
        .add_document("knowledge", "long.md", &long_text, &json!({}))
        .await
        .unwrap();
    store
        .add_document("projects", "p.md", "short project note", &json!({}))
        .await
        .unwrap();

    let info = store.dataset_info("knowledge").await.unwrap();
    assert_eq!(info.dataset, "knowledge");
    assert_eq!(info.document_count, 1);
    assert!(info.chunk_count > 1);
    assert_eq!(info.documents.len(), 1);
    assert_eq!(info.documents[0].filename, "long.md");

    let datasets = store.list_datasets().await.unwrap();
    let names: Vec<&str> = datasets.iter().map(|(name, _)| name.as_str()).collect();
    assert!(names.contains(&"knowledge"));
    assert!(names.contains(&"projects"));
}

#[tokio::test]
async fn metadata_round_trips_through_query() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    store
        .add_document(
            "knowledge",
            "tagged.md",
            "rust with metadata",
            &json!({ "source": "email", "priority": 2 }),
        )
        .await
        .unwrap();

    let hits = store.query("knowledge", "rust", 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].metadata["source"], "email");
    assert_eq!(hits[0].metadata["priority"], 2);
}

#[tokio::test]
async fn blank_dataset_or_filename_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = test_store(test_pool(&tmp).await);

    assert!(store
        .add_document("", "a.md", "text", &json!({}))
        .await
        .is_err());
    assert!(store
        .add_document("knowledge", "  ", "text", &json!({}))
        .await
        .is_err());
}

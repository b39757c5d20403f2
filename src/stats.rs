//! Database statistics and health overview.
//!
//! A quick summary of what the store holds: document and chunk counts,
//! per-dataset breakdowns, and conversation log size. Used by `sk stats`
//! to give confidence that ingestion is working as expected.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::open_pool(&config.db).await?;

    let total_docs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(&pool)
        .await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(&pool)
        .await?;

    let total_messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Sidekick — Database Stats");
    println!("=========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Documents:  {}", total_docs);
    println!("  Chunks:     {}", total_chunks);
    println!("  Messages:   {}", total_messages);
    println!();

    let rows = sqlx::query(
        r#"
        SELECT d.dataset,
               COUNT(DISTINCT d.id) AS doc_count,
               COUNT(c.id) AS chunk_count
        FROM documents d
        LEFT JOIN chunks c ON c.document_id = d.id
        GROUP BY d.dataset
        ORDER BY d.dataset ASC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !rows.is_empty() {
        println!("  Per dataset:");
        for row in &rows {
            let dataset: String = row.get("dataset");
            let doc_count: i64 = row.get("doc_count");
            let chunk_count: i64 = row.get("chunk_count");
            println!(
                "    {:<16} {} docs, {} chunks",
                dataset, doc_count, chunk_count
            );
        }
    }

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

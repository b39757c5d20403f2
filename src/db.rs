//! SQLite pool construction.
//!
//! One database file holds everything Sidekick persists: documents,
//! chunks, and the conversation log. WAL journaling fits the runtime's
//! access pattern — a single local user whose short ingest transactions
//! interleave with read-heavy similarity scans, so readers must not
//! block behind a commit.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::DbConfig;

/// Open the runtime's database, creating the file and any missing parent
/// directories on first use.
pub async fn open_pool(db: &DbConfig) -> Result<SqlitePool> {
    if let Some(parent) = db.path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory {}", parent.display())
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(&db.path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {}", db.path.display()))?;

    Ok(pool)
}

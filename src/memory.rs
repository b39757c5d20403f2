//! Conversation memory: the short-term, append-only session log.
//!
//! The orchestrator treats the log as an external collaborator behind
//! [`ConversationMemory`]; it appends request/response pairs and reads a
//! bounded tail for context assembly, but never manages the log's
//! lifecycle beyond the explicit `memory_cleanup` action. The shipped
//! [`SqliteMemory`] keeps the log in the same database file the store
//! uses, purely for the CLI's convenience.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// One stored conversation message.
#[derive(Debug, Clone)]
pub struct MessageRow {
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

/// Append-only conversation log keyed by session id.
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Append one message to a session.
    async fn add_message(&self, session_id: &str, role: &str, content: &str) -> Result<()>;

    /// Render the last `max_messages` of a session as a text block,
    /// oldest first, one `role: content` line per message.
    async fn get_context(&self, session_id: &str, max_messages: usize) -> Result<String>;

    /// Substring search over stored messages, optionally scoped to one session.
    async fn search(&self, query: &str, session_id: Option<&str>) -> Result<Vec<MessageRow>>;

    /// Remove a session's messages. Returns the number removed.
    async fn cleanup(&self, session_id: &str) -> Result<u64>;
}

/// SQLite-backed conversation log.
pub struct SqliteMemory {
    pool: SqlitePool,
}

impl SqliteMemory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationMemory for SqliteMemory {
    async fn add_message(&self, session_id: &str, role: &str, content: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session_id)
        .bind(role)
        .bind(content)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_context(&self, session_id: &str, max_messages: usize) -> Result<String> {
        let rows = sqlx::query(
            "SELECT role, content FROM messages WHERE session_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(session_id)
        .bind(max_messages as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: Vec<String> = rows
            .iter()
            .map(|row| {
                let role: String = row.get("role");
                let content: String = row.get("content");
                format!("{}: {}", role, content)
            })
            .collect();
        lines.reverse(); // back to chronological order

        Ok(lines.join("\n"))
    }

    async fn search(&self, query: &str, session_id: Option<&str>) -> Result<Vec<MessageRow>> {
        let pattern = format!("%{}%", query);
        let rows = match session_id {
            Some(session) => {
                sqlx::query(
                    "SELECT session_id, role, content, created_at FROM messages \
                     WHERE session_id = ? AND content LIKE ? ORDER BY id ASC",
                )
                .bind(session)
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT session_id, role, content, created_at FROM messages \
                     WHERE content LIKE ? ORDER BY id ASC",
                )
                .bind(&pattern)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| MessageRow {
                session_id: row.get("session_id"),
                role: row.get("role"),
                content: row.get("content"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn cleanup(&self, session_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

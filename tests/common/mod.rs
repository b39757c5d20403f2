//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use sidekick::action::{Action, ToolDomain};
use sidekick::config::ChunkingConfig;
use sidekick::embedding::Embedder;
use sidekick::migrate;
use sidekick::reasoning::{ChatMessage, Reasoner};
use sidekick::store::RetrievalStore;
use sidekick::tools::{ToolCallContext, ToolClient, ToolOutput};

/// Deterministic keyword-count embedder. Texts mentioning the same
/// keywords land close together under cosine similarity, which makes
/// ranking assertions predictable without a real provider.
pub struct FakeEmbedder;

const KEYWORDS: [&str; 3] = ["rust", "python", "cloud"];

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-keywords"
    }

    fn dims(&self) -> usize {
        KEYWORDS.len() + 1
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|kw| lower.matches(kw).count() as f32)
            .collect();
        // Constant component keeps every vector non-zero.
        vector.push(1.0);
        Ok(vector)
    }
}

/// Reasoner that replays a scripted queue of replies and fails once the
/// script runs out.
pub struct FakeReasoner {
    replies: Mutex<VecDeque<String>>,
}

impl FakeReasoner {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
        }
    }

    /// A reasoner with an empty script; every call fails.
    pub fn failing() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Reasoner for FakeReasoner {
    async fn ask(&self, _messages: &[ChatMessage]) -> Result<String> {
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => Ok(reply),
            None => bail!("scripted reasoner exhausted"),
        }
    }

    async fn ask_with_image(&self, _prompt: &str, _image: &[u8]) -> Result<String> {
        bail!("scripted reasoner has no vision")
    }
}

/// Tool client that records every call and echoes the arguments back.
pub struct EchoTool {
    domain: ToolDomain,
    pub calls: Mutex<Vec<(String, Value)>>,
}

impl EchoTool {
    pub fn new(domain: ToolDomain) -> Self {
        Self {
            domain,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ToolClient for EchoTool {
    fn domain(&self) -> ToolDomain {
        self.domain
    }

    async fn call(
        &self,
        action: &Action,
        args: &Value,
        _ctx: &ToolCallContext,
    ) -> Result<ToolOutput> {
        self.calls
            .lock()
            .unwrap()
            .push((action.name().to_string(), args.clone()));
        Ok(ToolOutput::success(json!({ "echo": args })))
    }
}

/// Fresh SQLite database in a temp dir, schema applied.
pub async fn test_pool(dir: &TempDir) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("test.sqlite"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();
    migrate::apply_schema(&pool).await.unwrap();
    pool
}

/// Store over the fake embedder with small chunks.
pub fn test_store(pool: SqlitePool) -> Arc<RetrievalStore> {
    Arc::new(RetrievalStore::new(
        pool,
        Arc::new(FakeEmbedder),
        ChunkingConfig {
            chunk_size: 200,
            overlap: 40,
        },
    ))
}

//! Tool clients: uniform capability wrappers the executor dispatches to.
//!
//! One [`ToolClient`] per capability domain (search, files, system,
//! input, vision, knowledge, memory), registered in a [`ToolRegistry`].
//! Most domains are external collaborators reached only through this
//! trait; the runtime ships two real clients — [`KnowledgeTool`] over
//! the retrieval store and [`MemoryTool`] over the conversation log.
//!
//! A client reports refusals as [`ToolStatus::Denied`] so callers can
//! tell "not authorized" from "failed"; hard failures are ordinary
//! `Err` values that the executor catches per step.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{Action, ToolDomain};
use crate::memory::ConversationMemory;
use crate::store::RetrievalStore;

/// Outcome discriminator for a tool call that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Success,
    Denied,
}

/// Result payload of a completed tool call.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ToolStatus,
    pub data: Value,
}

impl ToolOutput {
    pub fn success(data: Value) -> Self {
        Self {
            status: ToolStatus::Success,
            data,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Denied,
            data: json!({ "reason": reason.into() }),
        }
    }
}

/// Per-call context handed to every tool invocation.
pub struct ToolCallContext {
    pub session_id: String,
}

/// One capability domain's client: `call(action, args) -> result`.
#[async_trait]
pub trait ToolClient: Send + Sync {
    fn domain(&self) -> ToolDomain;

    async fn call(&self, action: &Action, args: &Value, ctx: &ToolCallContext)
        -> Result<ToolOutput>;
}

/// Registry mapping each capability domain to its client.
pub struct ToolRegistry {
    clients: HashMap<ToolDomain, Arc<dyn ToolClient>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
        }
    }

    pub fn register(&mut self, client: Arc<dyn ToolClient>) {
        self.clients.insert(client.domain(), client);
    }

    pub fn find(&self, domain: ToolDomain) -> Option<&Arc<dyn ToolClient>> {
        self.clients.get(&domain)
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render any argument value as ingestible text. Strings pass through;
/// structured values (e.g. a substituted `$previous` result) are
/// serialized.
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Knowledge tool (rag_query, rag_add)
// ═══════════════════════════════════════════════════════════════════════

/// Built-in client for the knowledge domain, backed by the retrieval store.
pub struct KnowledgeTool {
    store: Arc<RetrievalStore>,
    default_query_dataset: String,
    default_add_dataset: String,
    default_top_k: usize,
}

impl KnowledgeTool {
    pub fn new(
        store: Arc<RetrievalStore>,
        default_query_dataset: String,
        default_add_dataset: String,
        default_top_k: usize,
    ) -> Self {
        Self {
            store,
            default_query_dataset,
            default_add_dataset,
            default_top_k,
        }
    }
}

#[async_trait]
impl ToolClient for KnowledgeTool {
    fn domain(&self) -> ToolDomain {
        ToolDomain::Knowledge
    }

    async fn call(
        &self,
        action: &Action,
        args: &Value,
        _ctx: &ToolCallContext,
    ) -> Result<ToolOutput> {
        match action {
            Action::RagQuery => {
                let dataset = args
                    .get("dataset")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&self.default_query_dataset);
                let question = args
                    .get("query")
                    .or_else(|| args.get("input"))
                    .map(value_as_text)
                    .unwrap_or_default();
                if question.trim().is_empty() {
                    anyhow::bail!("rag_query requires a 'query' argument");
                }
                let top_k = args
                    .get("top_k")
                    .and_then(|v| v.as_u64())
                    .map(|k| k as usize)
                    .unwrap_or(self.default_top_k);

                let hits = self.store.query(dataset, &question, top_k).await?;
                Ok(ToolOutput::success(json!({
                    "dataset": dataset,
                    "results": hits,
                })))
            }
            Action::RagAdd => {
                let dataset = args
                    .get("dataset")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&self.default_add_dataset);
                let content = args
                    .get("content")
                    .or_else(|| args.get("input"))
                    .map(value_as_text)
                    .unwrap_or_default();
                if content.trim().is_empty() {
                    anyhow::bail!("rag_add requires a 'content' argument");
                }
                let generated;
                let filename = match args.get("filename").and_then(|v| v.as_str()) {
                    Some(name) => name,
                    None => {
                        generated = format!("note-{}.md", uuid::Uuid::new_v4());
                        &generated
                    }
                };
                let metadata = args.get("metadata").cloned().unwrap_or_else(|| json!({}));

                let doc_id = self
                    .store
                    .add_document(dataset, filename, &content, &metadata)
                    .await?;
                Ok(ToolOutput::success(json!({
                    "dataset": dataset,
                    "filename": filename,
                    "document_id": doc_id,
                })))
            }
            other => anyhow::bail!("knowledge tool cannot handle action '{}'", other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Memory tool (memory_recall, memory_cleanup)
// ═══════════════════════════════════════════════════════════════════════

/// Built-in client for the memory domain, backed by the conversation log.
pub struct MemoryTool {
    memory: Arc<dyn ConversationMemory>,
}

impl MemoryTool {
    pub fn new(memory: Arc<dyn ConversationMemory>) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl ToolClient for MemoryTool {
    fn domain(&self) -> ToolDomain {
        ToolDomain::Memory
    }

    async fn call(
        &self,
        action: &Action,
        args: &Value,
        ctx: &ToolCallContext,
    ) -> Result<ToolOutput> {
        match action {
            Action::MemoryRecall => {
                let query = args
                    .get("query")
                    .or_else(|| args.get("input"))
                    .map(value_as_text)
                    .unwrap_or_default();
                if query.trim().is_empty() {
                    anyhow::bail!("memory_recall requires a 'query' argument");
                }
                let all_sessions = args
                    .get("all_sessions")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let scope = if all_sessions {
                    None
                } else {
                    Some(ctx.session_id.as_str())
                };

                let messages = self.memory.search(&query, scope).await?;
                let rendered: Vec<Value> = messages
                    .iter()
                    .map(|m| {
                        json!({
                            "session_id": m.session_id,
                            "role": m.role,
                            "content": m.content,
                        })
                    })
                    .collect();
                Ok(ToolOutput::success(json!({ "messages": rendered })))
            }
            Action::MemoryCleanup => {
                let removed = self.memory.cleanup(&ctx.session_id).await?;
                Ok(ToolOutput::success(json!({ "removed": removed })))
            }
            other => anyhow::bail!("memory tool cannot handle action '{}'", other),
        }
    }
}

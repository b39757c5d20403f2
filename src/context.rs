//! Context assembly: one text block from long- and short-term memory.
//!
//! Queries the configured datasets in fixed priority order — permanent
//! knowledge (top 2), ongoing projects (top 2), scratch notes (top 1) —
//! plus the tail of the conversation log, and concatenates the non-empty
//! sections under labeled headers.
//!
//! Degradation over failure: a section whose collaborator errors is
//! logged and omitted, exactly like an empty one. `build` itself never
//! fails; at worst it returns an empty string.

use std::sync::Arc;

use crate::config::{MemoryConfig, RetrievalConfig};
use crate::memory::ConversationMemory;
use crate::store::RetrievalStore;

pub struct ContextAssembler {
    store: Arc<RetrievalStore>,
    memory: Arc<dyn ConversationMemory>,
    retrieval: RetrievalConfig,
    memory_cfg: MemoryConfig,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<RetrievalStore>,
        memory: Arc<dyn ConversationMemory>,
        retrieval: RetrievalConfig,
        memory_cfg: MemoryConfig,
    ) -> Self {
        Self {
            store,
            memory,
            retrieval,
            memory_cfg,
        }
    }

    /// Assemble the context block for one request.
    pub async fn build(&self, session_id: &str, user_text: &str) -> String {
        let mut sections: Vec<String> = Vec::new();

        let dataset_plan = [
            (&self.retrieval.knowledge_dataset, "Permanent knowledge", 2),
            (&self.retrieval.projects_dataset, "Ongoing projects", 2),
            (&self.retrieval.scratch_dataset, "Scratch notes", 1),
        ];

        for (dataset, label, top_k) in dataset_plan {
            match self.store.query(dataset, user_text, top_k).await {
                Ok(hits) if !hits.is_empty() => {
                    let body = hits
                        .iter()
                        .map(|hit| format!("- [{}] {}", hit.filename, hit.content.trim()))
                        .collect::<Vec<_>>()
                        .join("\n");
                    sections.push(format!("## {}\n{}", label, body));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(dataset, error = %e, "context section skipped");
                }
            }
        }

        match self
            .memory
            .get_context(session_id, self.memory_cfg.max_messages)
            .await
        {
            Ok(log) if !log.trim().is_empty() => {
                sections.push(format!("## Recent conversation\n{}", log));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(session_id, error = %e, "conversation section skipped");
            }
        }

        sections.join("\n\n")
    }
}

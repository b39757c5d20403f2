//! The closed action vocabulary.
//!
//! Every step a plan can name is one of these variants; the model's
//! free-text action strings are folded into the enum at parse time.
//! Anything outside the vocabulary becomes [`Action::Unsupported`],
//! which the executor turns into an error result instead of halting —
//! the "continue past unknown actions" behavior lives in the type, not
//! in a missing map key.

use serde::{Deserialize, Serialize};

/// Capability domain a tool client serves. One client per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolDomain {
    Search,
    Files,
    System,
    Input,
    Vision,
    Knowledge,
    Memory,
}

/// One supported action, the unit of plan execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    SearchWeb,
    FileRead,
    FileWrite,
    FileDelete,
    ProcessList,
    ProcessRun,
    ProcessKill,
    InputControl,
    VisionAnalyze,
    RagQuery,
    RagAdd,
    MemoryRecall,
    MemoryCleanup,
    /// Anything the vocabulary doesn't cover; carries the raw name.
    Unsupported(String),
}

impl Action {
    /// All supported action names, in the order the planner prompt lists them.
    pub const CANONICAL: [&'static str; 13] = [
        "search_web",
        "file_read",
        "file_write",
        "file_delete",
        "process_list",
        "process_run",
        "process_kill",
        "input_control",
        "vision_analyze",
        "rag_query",
        "rag_add",
        "memory_recall",
        "memory_cleanup",
    ];

    pub fn from_name(name: &str) -> Action {
        match name {
            "search_web" => Action::SearchWeb,
            "file_read" => Action::FileRead,
            "file_write" => Action::FileWrite,
            "file_delete" => Action::FileDelete,
            "process_list" => Action::ProcessList,
            "process_run" => Action::ProcessRun,
            "process_kill" => Action::ProcessKill,
            "input_control" => Action::InputControl,
            "vision_analyze" => Action::VisionAnalyze,
            "rag_query" => Action::RagQuery,
            "rag_add" => Action::RagAdd,
            "memory_recall" => Action::MemoryRecall,
            "memory_cleanup" => Action::MemoryCleanup,
            other => Action::Unsupported(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Action::SearchWeb => "search_web",
            Action::FileRead => "file_read",
            Action::FileWrite => "file_write",
            Action::FileDelete => "file_delete",
            Action::ProcessList => "process_list",
            Action::ProcessRun => "process_run",
            Action::ProcessKill => "process_kill",
            Action::InputControl => "input_control",
            Action::VisionAnalyze => "vision_analyze",
            Action::RagQuery => "rag_query",
            Action::RagAdd => "rag_add",
            Action::MemoryRecall => "memory_recall",
            Action::MemoryCleanup => "memory_cleanup",
            Action::Unsupported(name) => name,
        }
    }

    /// Which client the executor dispatches this action to.
    /// `Unsupported` has no domain — it never reaches a client.
    pub fn domain(&self) -> Option<ToolDomain> {
        match self {
            Action::SearchWeb => Some(ToolDomain::Search),
            Action::FileRead | Action::FileWrite | Action::FileDelete => Some(ToolDomain::Files),
            Action::ProcessList | Action::ProcessRun | Action::ProcessKill => {
                Some(ToolDomain::System)
            }
            Action::InputControl => Some(ToolDomain::Input),
            Action::VisionAnalyze => Some(ToolDomain::Vision),
            Action::RagQuery | Action::RagAdd => Some(ToolDomain::Knowledge),
            Action::MemoryRecall | Action::MemoryCleanup => Some(ToolDomain::Memory),
            Action::Unsupported(_) => None,
        }
    }

    /// State-mutating or resource-affecting actions; a plan containing
    /// any one of these is never auto-executed without confirmation.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Action::FileWrite
                | Action::FileDelete
                | Action::ProcessRun
                | Action::ProcessKill
                | Action::InputControl
                | Action::RagAdd
                | Action::MemoryCleanup
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

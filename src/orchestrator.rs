//! The orchestrator decision loop.
//!
//! One request flows through: intent detection → context assembly →
//! plan generation → sensitivity gate → step execution (per execution
//! mode) → conversation memory update. Each stage degrades rather than
//! aborts, so [`Orchestrator::handle`] always returns a structured
//! result with a non-empty narrative, even on total failure.
//!
//! One logical task per request: every collaborator call is async but
//! sequential. The orchestrator holds no cross-request mutable state,
//! so concurrent callers (e.g. a background capture timer) need no
//! locking here beyond whatever admission flag they keep themselves.

use std::sync::Arc;

use crate::context::ContextAssembler;
use crate::executor::{ExecutionMode, StepExecutor, StepResult, StepStatus};
use crate::gate::is_sensitive;
use crate::intent::{IntentDetector, IntentTag};
use crate::memory::ConversationMemory;
use crate::plan::{Plan, PlanGenerator};

/// Everything a caller learns about one handled request.
#[derive(Debug)]
pub struct OrchestratorResult {
    pub intents: Vec<IntentTag>,
    pub plan: Plan,
    pub sensitive: bool,
    /// True when `Auto` mode declined to run a gated plan.
    pub requires_confirmation: bool,
    pub executed: Vec<StepResult>,
    /// Steps planned but not run in this call.
    pub remaining_steps: usize,
    pub response: String,
}

pub struct Orchestrator {
    intents: IntentDetector,
    assembler: ContextAssembler,
    planner: PlanGenerator,
    executor: StepExecutor,
    memory: Arc<dyn ConversationMemory>,
}

impl Orchestrator {
    pub fn new(
        intents: IntentDetector,
        assembler: ContextAssembler,
        planner: PlanGenerator,
        executor: StepExecutor,
        memory: Arc<dyn ConversationMemory>,
    ) -> Self {
        Self {
            intents,
            assembler,
            planner,
            executor,
            memory,
        }
    }

    /// Handle one request end to end. Infallible by contract: failures
    /// along the way surface inside the result, never as `Err`.
    pub async fn handle(
        &self,
        session_id: &str,
        user_text: &str,
        mode: ExecutionMode,
    ) -> OrchestratorResult {
        let intents = self.intents.detect(user_text);
        tracing::debug!(?intents, "request classified");

        let context_block = self.assembler.build(session_id, user_text).await;
        let plan = self.planner.plan(user_text, &intents, &context_block).await;
        let sensitive = is_sensitive(&plan.steps);

        let (executed, remaining_steps, requires_confirmation) = match mode {
            ExecutionMode::PlanOnly => (Vec::new(), plan.steps.len(), false),
            ExecutionMode::StepByStep => {
                let first = &plan.steps[..plan.steps.len().min(1)];
                let executed = self.executor.execute(first, session_id).await;
                (executed, plan.steps.len().saturating_sub(1), false)
            }
            ExecutionMode::Auto => {
                if sensitive {
                    tracing::debug!(steps = plan.steps.len(), "plan gated, not executing");
                    (Vec::new(), plan.steps.len(), true)
                } else {
                    let executed = self.executor.execute(&plan.steps, session_id).await;
                    (executed, 0, false)
                }
            }
        };

        let response = narrate(&plan, &executed, requires_confirmation, remaining_steps);

        // Best-effort memory update; a dead log never fails the request.
        if let Err(e) = self.memory.add_message(session_id, "user", user_text).await {
            tracing::warn!(error = %e, "failed to record user message");
        }
        if let Err(e) = self
            .memory
            .add_message(session_id, "assistant", &response)
            .await
        {
            tracing::warn!(error = %e, "failed to record assistant message");
        }

        OrchestratorResult {
            intents,
            plan,
            sensitive,
            requires_confirmation,
            executed,
            remaining_steps,
            response,
        }
    }
}

/// The user-facing narrative. Never empty: falls back from the plan's
/// own response to an execution summary to a confirmation notice.
fn narrate(
    plan: &Plan,
    executed: &[StepResult],
    requires_confirmation: bool,
    remaining_steps: usize,
) -> String {
    if !plan.response.trim().is_empty() {
        return plan.response.clone();
    }

    if requires_confirmation {
        return format!(
            "This plan has {} step(s) that need your confirmation before running.",
            remaining_steps
        );
    }

    if !executed.is_empty() {
        let succeeded = executed
            .iter()
            .filter(|r| r.status == StepStatus::Success)
            .count();
        let failures: Vec<&str> = executed
            .iter()
            .filter_map(|r| r.error.as_deref())
            .collect();

        let mut summary = format!(
            "Ran {} step(s): {} succeeded, {} failed.",
            executed.len(),
            succeeded,
            executed.len() - succeeded
        );
        if !failures.is_empty() {
            summary.push_str(&format!(" Errors: {}", failures.join("; ")));
        }
        return summary;
    }

    if remaining_steps > 0 {
        return format!("Planned {} step(s); none run yet.", remaining_steps);
    }

    "Nothing to do.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(status: StepStatus, error: Option<&str>) -> StepResult {
        StepResult {
            action: "search_web".to_string(),
            status,
            data: json!({}),
            error: error.map(|e| e.to_string()),
        }
    }

    #[test]
    fn narrate_prefers_plan_response() {
        let mut plan = Plan::error("boom");
        plan.response = "All done.".to_string();
        let text = narrate(&plan, &[], false, 0);
        assert_eq!(text, "All done.");
    }

    #[test]
    fn narrate_summarizes_execution_when_plan_is_silent() {
        let mut plan = Plan::error("");
        plan.response.clear();
        let executed = vec![
            result(StepStatus::Success, None),
            result(StepStatus::Error, Some("boom")),
        ];
        let text = narrate(&plan, &executed, false, 0);
        assert!(text.contains("2 step(s)"));
        assert!(text.contains("1 succeeded"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn narrate_mentions_confirmation() {
        let mut plan = Plan::error("");
        plan.response.clear();
        let text = narrate(&plan, &[], true, 3);
        assert!(text.contains("confirmation"));
        assert!(text.contains('3'));
    }

    #[test]
    fn narrate_never_empty() {
        let mut plan = Plan::error("");
        plan.response.clear();
        assert!(!narrate(&plan, &[], false, 0).is_empty());
    }
}

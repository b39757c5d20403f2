//! Sequential step execution with result chaining.
//!
//! Steps run strictly in order — no parallelism, no reordering. The one
//! inter-step data-flow mechanism is the `"$previous"` sentinel: any
//! argument holding that exact string is replaced by the prior step's
//! output before dispatch. No expression language, no branching.
//!
//! Execution is best-effort, not fail-fast: an unsupported action, a
//! missing tool client, or a tool error each produce an error
//! [`StepResult`] and execution proceeds to the next step. Nothing a
//! step does can propagate out of [`StepExecutor::execute`] as an `Err`.

use serde::Serialize;
use serde_json::{json, Value};

use crate::plan::Step;
use crate::tools::{ToolCallContext, ToolRegistry, ToolStatus};

/// Argument sentinel replaced with the previous step's output.
const PREVIOUS_SENTINEL: &str = "$previous";

/// How much of a plan runs before control returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run every step, but only when the sensitivity gate passed.
    Auto,
    /// Run exactly the first step and report how many remain.
    StepByStep,
    /// Run nothing; the plan is the product.
    PlanOnly,
}

/// Outcome discriminator of one executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
    Denied,
}

/// Result of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub action: String,
    pub status: StepStatus,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    fn success(action: &str, data: Value) -> Self {
        Self {
            action: action.to_string(),
            status: StepStatus::Success,
            data,
            error: None,
        }
    }

    fn denied(action: &str, data: Value) -> Self {
        Self {
            action: action.to_string(),
            status: StepStatus::Denied,
            data,
            error: None,
        }
    }

    fn error(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            status: StepStatus::Error,
            data: Value::Null,
            error: Some(message.into()),
        }
    }
}

/// Runs plan steps in order against registered tool clients.
pub struct StepExecutor {
    registry: ToolRegistry,
}

impl StepExecutor {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute all given steps. Callers slice the step list according to
    /// the execution mode before calling.
    pub async fn execute(&self, steps: &[Step], session_id: &str) -> Vec<StepResult> {
        let ctx = ToolCallContext {
            session_id: session_id.to_string(),
        };

        let mut results = Vec::with_capacity(steps.len());
        let mut previous: Option<Value> = None;

        for step in steps {
            let args = substitute_previous(&step.args, previous.as_ref());
            let result = self.run_step(step, &args, &ctx).await;

            previous = Some(match result.status {
                StepStatus::Error => json!({ "error": result.error }),
                _ => result.data.clone(),
            });
            results.push(result);
        }

        results
    }

    async fn run_step(&self, step: &Step, args: &Value, ctx: &ToolCallContext) -> StepResult {
        let name = step.action.name();

        let Some(domain) = step.action.domain() else {
            tracing::warn!(action = name, "unsupported action");
            return StepResult::error(name, format!("Unsupported action: {}", name));
        };

        let Some(client) = self.registry.find(domain) else {
            return StepResult::error(name, format!("No tool registered for {:?} actions", domain));
        };

        tracing::debug!(action = name, "dispatching step");
        match client.call(&step.action, args, ctx).await {
            Ok(output) => match output.status {
                ToolStatus::Success => StepResult::success(name, output.data),
                ToolStatus::Denied => StepResult::denied(name, output.data),
            },
            Err(e) => {
                tracing::warn!(action = name, error = %e, "step failed");
                StepResult::error(name, e.to_string())
            }
        }
    }
}

/// Replace every top-level `"$previous"` argument with the prior step's
/// output (null when there is no prior step).
fn substitute_previous(
    args: &serde_json::Map<String, Value>,
    previous: Option<&Value>,
) -> Value {
    let substituted: serde_json::Map<String, Value> = args
        .iter()
        .map(|(key, value)| {
            let resolved = if value.as_str() == Some(PREVIOUS_SENTINEL) {
                previous.cloned().unwrap_or(Value::Null)
            } else {
                value.clone()
            };
            (key.clone(), resolved)
        })
        .collect();
    Value::Object(substituted)
}

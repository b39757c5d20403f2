//! Plan generation and parsing.
//!
//! [`PlanGenerator`] builds the reasoning prompt, makes one call to the
//! [`Reasoner`], and parses the reply into a [`Plan`]. Models do not
//! reliably emit clean JSON, so extraction is tiered:
//!
//! 1. a fenced ```json block, if present;
//! 2. else the first brace-delimited object containing an `"intention"` key;
//! 3. else a degraded plan — the raw text becomes the narrative response,
//!    confidence drops to 0.6, and no steps are produced.
//!
//! A provider failure becomes an `intention = "error"` plan with zero
//! confidence. Either way the caller always receives a well-typed plan;
//! `plan()` has no error path.

use std::sync::Arc;

use crate::action::Action;
use crate::intent::IntentTag;
use crate::reasoning::{ChatMessage, Reasoner};

/// Confidence assigned when the model omits or mangles the field.
const DEFAULT_CONFIDENCE: f64 = 0.7;
/// Confidence of a degraded (unparseable-reply) plan.
const DEGRADED_CONFIDENCE: f64 = 0.6;

/// One action with its arguments, the unit of execution.
#[derive(Debug, Clone)]
pub struct Step {
    pub action: Action,
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// Structured output of intent analysis.
///
/// Transient: produced per request, never persisted. `degraded` marks a
/// plan synthesized from an unparseable model reply.
#[derive(Debug, Clone)]
pub struct Plan {
    pub intention: String,
    pub confidence: f64,
    pub steps: Vec<Step>,
    pub response: String,
    pub degraded: bool,
}

impl Plan {
    /// Plan representing a reasoning-provider failure. The orchestration
    /// loop must never crash on one, so the error is carried as data.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            intention: "error".to_string(),
            confidence: 0.0,
            steps: Vec::new(),
            response: message.into(),
            degraded: false,
        }
    }
}

/// Builds the prompt, calls the model once, and parses the reply.
pub struct PlanGenerator {
    reasoner: Arc<dyn Reasoner>,
}

impl PlanGenerator {
    pub fn new(reasoner: Arc<dyn Reasoner>) -> Self {
        Self { reasoner }
    }

    /// Generate a plan for one request. Infallible by contract: provider
    /// and parse failures both surface as plan contents.
    pub async fn plan(
        &self,
        user_text: &str,
        intents: &[IntentTag],
        context_block: &str,
    ) -> Plan {
        let primary = primary_intent(intents);
        let messages = build_messages(user_text, primary, context_block);

        match self.reasoner.ask(&messages).await {
            Ok(raw) => parse_plan(&raw, primary),
            Err(e) => {
                tracing::warn!(error = %e, "reasoning call failed");
                Plan::error(format!("Reasoning failed: {}", e))
            }
        }
    }
}

fn primary_intent(intents: &[IntentTag]) -> &'static str {
    intents
        .first()
        .copied()
        .unwrap_or(IntentTag::Fallback)
        .as_str()
}

fn build_messages(user_text: &str, primary: &str, context_block: &str) -> Vec<ChatMessage> {
    let actions = Action::CANONICAL.join(", ");
    let system = format!(
        "You are the planning engine of a personal assistant.\n\
         Detected primary intent: {primary}\n\
         Available actions: {actions}\n\n\
         Respond with a single JSON object with exactly these keys:\n\
         {{\n\
           \"intention\": \"<short label for what the user wants>\",\n\
           \"confidence\": <number between 0 and 1>,\n\
           \"steps\": [{{\"action\": \"<one of the available actions>\", ...action arguments}}],\n\
           \"response\": \"<what to tell the user>\"\n\
         }}\n\n\
         Use an empty steps array when no tool action is needed. A step \
         argument may take the literal value \"$previous\" to receive the \
         previous step's result."
    );

    let user = if context_block.trim().is_empty() {
        user_text.to_string()
    } else {
        format!("{context_block}\n\n## Request\n{user_text}")
    };

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// Tiered extraction of a plan object from raw model text.
pub fn parse_plan(raw: &str, primary_intent: &str) -> Plan {
    if let Some(object) = extract_plan_object(raw) {
        return coerce_plan(&object, primary_intent);
    }

    // No JSON anywhere: the reply is conversation, not a plan.
    Plan {
        intention: primary_intent.to_string(),
        confidence: DEGRADED_CONFIDENCE,
        steps: Vec::new(),
        response: raw.to_string(),
        degraded: true,
    }
}

fn extract_plan_object(raw: &str) -> Option<serde_json::Value> {
    // Tier 1: fenced block
    if let Some(block) = extract_fenced_block(raw) {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(block) {
            if value.get("intention").is_some() {
                return Some(value);
            }
        }
    }

    // Tier 2: first balanced brace-delimited object containing
    // "intention". Scanning per candidate keeps trailing prose (which
    // may itself contain a stray brace) from poisoning the parse.
    let mut search_from = 0;
    while let Some(offset) = raw[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_object_end(raw, start) {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw[start..=end]) {
                if value.get("intention").is_some() {
                    return Some(value);
                }
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte index of the `}` closing the object that opens at `start`,
/// skipping braces inside string literals.
fn balanced_object_end(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in raw.bytes().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the body of the first ``` fence (with or without a `json` tag).
fn extract_fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find("```")?;
    let after_open = &raw[open + 3..];
    // Skip a language tag up to the first newline
    let body_start = after_open.find('\n')? + 1;
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn coerce_plan(value: &serde_json::Value, primary_intent: &str) -> Plan {
    let intention = value
        .get("intention")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(primary_intent)
        .to_string();

    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let steps = value
        .get("steps")
        .and_then(|v| v.as_array())
        .map(|entries| entries.iter().map(coerce_step).collect())
        .unwrap_or_default();

    let response = value
        .get("response")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    Plan {
        intention,
        confidence,
        steps,
        response,
        degraded: false,
    }
}

fn coerce_step(entry: &serde_json::Value) -> Step {
    let empty = serde_json::Map::new();
    let object = entry.as_object().unwrap_or(&empty);

    let action = object
        .get("action")
        .and_then(|v| v.as_str())
        .map(Action::from_name)
        .unwrap_or_else(|| Action::Unsupported("unknown".to_string()));

    let args: serde_json::Map<String, serde_json::Value> = object
        .iter()
        .filter(|(key, _)| key.as_str() != "action")
        .map(|(key, val)| (key.clone(), val.clone()))
        .collect();

    Step { action, args }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json_block() {
        let raw = "Here is my plan:\n```json\n{\"intention\": \"lookup\", \"confidence\": 0.9, \"steps\": [{\"action\": \"search_web\", \"query\": \"rust\"}], \"response\": \"Searching.\"}\n```\nDone.";
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.intention, "lookup");
        assert!((plan.confidence - 0.9).abs() < 1e-9);
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, Action::SearchWeb);
        assert_eq!(plan.steps[0].args["query"], "rust");
        assert_eq!(plan.response, "Searching.");
    }

    #[test]
    fn parses_bare_json_object() {
        let raw = r#"{"intention": "chat", "confidence": 0.8, "steps": [], "response": "Hi!"}"#;
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.intention, "chat");
        assert!(plan.steps.is_empty());
    }

    #[test]
    fn parses_object_embedded_in_prose() {
        let raw = "Sure! {\"intention\": \"chat\", \"response\": \"hello\"} hope that helps";
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.intention, "chat");
    }

    #[test]
    fn stray_brace_in_trailing_prose_does_not_poison_the_parse() {
        let raw = r#"{"intention": "chat", "response": "done"} glad to help :-}"#;
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.intention, "chat");
        assert_eq!(plan.response, "done");
    }

    #[test]
    fn braces_inside_string_values_do_not_confuse_extraction() {
        let raw = r#"note: {"intention": "chat", "response": "use {braces} here"} end"#;
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.response, "use {braces} here");
    }

    #[test]
    fn earlier_object_without_intention_is_skipped() {
        let raw = r#"{"foo": 1} then {"intention": "chat", "steps": [], "response": "hi"}"#;
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.degraded);
        assert_eq!(plan.intention, "chat");
    }

    #[test]
    fn non_json_reply_degrades() {
        let raw = "I cannot help with that.";
        let plan = parse_plan(raw, "web_search");
        assert!(plan.degraded);
        assert_eq!(plan.intention, "web_search");
        assert!((plan.confidence - 0.6).abs() < 1e-9);
        assert!(plan.steps.is_empty());
        assert_eq!(plan.response, raw);
    }

    #[test]
    fn object_without_intention_key_degrades() {
        let raw = r#"{"answer": 42}"#;
        let plan = parse_plan(raw, "fallback");
        assert!(plan.degraded);
        assert_eq!(plan.response, raw);
    }

    #[test]
    fn missing_confidence_defaults() {
        let raw = r#"{"intention": "chat", "steps": [], "response": "ok"}"#;
        let plan = parse_plan(raw, "fallback");
        assert!((plan.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn invalid_confidence_defaults() {
        let raw = r#"{"intention": "chat", "confidence": "very", "steps": []}"#;
        let plan = parse_plan(raw, "fallback");
        assert!((plan.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_confidence_clamped() {
        let raw = r#"{"intention": "chat", "confidence": 1.7, "steps": []}"#;
        let plan = parse_plan(raw, "fallback");
        assert!((plan.confidence - 1.0).abs() < 1e-9);

        let raw = r#"{"intention": "chat", "confidence": -0.2, "steps": []}"#;
        let plan = parse_plan(raw, "fallback");
        assert_eq!(plan.confidence, 0.0);
    }

    #[test]
    fn step_without_action_becomes_unknown() {
        let raw = r#"{"intention": "x", "steps": [{"query": "orphan"}]}"#;
        let plan = parse_plan(raw, "fallback");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(
            plan.steps[0].action,
            Action::Unsupported("unknown".to_string())
        );
        assert_eq!(plan.steps[0].args["query"], "orphan");
    }

    #[test]
    fn step_args_exclude_action_key() {
        let raw = r#"{"intention": "x", "steps": [{"action": "file_read", "path": "/tmp/a"}]}"#;
        let plan = parse_plan(raw, "fallback");
        assert!(!plan.steps[0].args.contains_key("action"));
        assert_eq!(plan.steps[0].args["path"], "/tmp/a");
    }

    #[test]
    fn error_plan_shape() {
        let plan = Plan::error("connection refused");
        assert_eq!(plan.intention, "error");
        assert_eq!(plan.confidence, 0.0);
        assert!(plan.steps.is_empty());
        assert!(plan.response.contains("connection refused"));
    }

    #[test]
    fn prompt_names_primary_intent_and_actions() {
        let messages = build_messages("find rust news", "web_search", "");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("web_search"));
        assert!(messages[0].content.contains("file_delete"));
        assert_eq!(messages[1].content, "find rust news");
    }

    #[test]
    fn prompt_includes_context_block_when_present() {
        let messages = build_messages("hi", "fallback", "## Recent conversation\nuser: hello");
        assert!(messages[1].content.contains("Recent conversation"));
        assert!(messages[1].content.contains("## Request"));
    }
}

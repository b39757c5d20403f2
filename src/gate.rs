//! The sensitivity gate: may a plan run unattended?
//!
//! A binary classification, not a risk score. A plan needs explicit
//! confirmation when it has more than one step, or when any single step
//! mutates state (file writes/deletes, process control, input devices,
//! knowledge-base writes, memory cleanup). Read-only actions — search,
//! reads, recall — pass on their own. Multi-step plans are always gated
//! regardless of what the steps do.

use crate::plan::Step;

/// True when the plan requires confirmation before execution.
pub fn is_sensitive(steps: &[Step]) -> bool {
    if steps.len() > 1 {
        return true;
    }
    steps.iter().any(|step| step.action.is_mutating())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    fn step(action: Action) -> Step {
        Step {
            action,
            args: serde_json::Map::new(),
        }
    }

    #[test]
    fn empty_plan_is_not_sensitive() {
        assert!(!is_sensitive(&[]));
    }

    #[test]
    fn single_search_step_is_not_sensitive() {
        assert!(!is_sensitive(&[step(Action::SearchWeb)]));
    }

    #[test]
    fn single_file_delete_is_sensitive() {
        assert!(is_sensitive(&[step(Action::FileDelete)]));
    }

    #[test]
    fn single_read_only_steps_pass() {
        for action in [
            Action::SearchWeb,
            Action::FileRead,
            Action::RagQuery,
            Action::MemoryRecall,
        ] {
            assert!(!is_sensitive(&[step(action)]));
        }
    }

    #[test]
    fn single_mutating_steps_are_gated() {
        for action in [
            Action::FileWrite,
            Action::ProcessKill,
            Action::InputControl,
            Action::RagAdd,
            Action::MemoryCleanup,
        ] {
            assert!(is_sensitive(&[step(action)]));
        }
    }

    #[test]
    fn two_steps_always_sensitive_even_read_only() {
        let steps = [step(Action::SearchWeb), step(Action::FileRead)];
        assert!(is_sensitive(&steps));
    }

    #[test]
    fn unsupported_single_step_is_not_sensitive() {
        // It will fail at dispatch anyway; no point blocking on it.
        assert!(!is_sensitive(&[step(Action::Unsupported(
            "teleport".to_string()
        ))]));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One decision made by the model for a single supervisor cycle.
///
/// Decoded from the model's JSON output. Each variant carries only the
/// fields it needs; a payload missing a required field fails at decode
/// time instead of deep inside dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Execute a named tool with a JSON input object.
    Tool {
        tool_name: String,
        tool_input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// Say something to the user without ending the run.
    Message {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// The current phase is done; advance to the next one.
    PhaseComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// The whole task is done; terminate the run successfully.
    TaskComplete {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// The model needs input from the user; suspend the run.
    RequestInput {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
}

impl Action {
    /// The wire name of this action's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Tool { .. } => "tool",
            Action::Message { .. } => "message",
            Action::PhaseComplete { .. } => "phase_complete",
            Action::TaskComplete { .. } => "task_complete",
            Action::RequestInput { .. } => "request_input",
        }
    }

    /// Model-provided reasoning, if any.
    pub fn reasoning(&self) -> Option<&str> {
        match self {
            Action::Tool { reasoning, .. }
            | Action::Message { reasoning, .. }
            | Action::PhaseComplete { reasoning, .. }
            | Action::TaskComplete { reasoning, .. }
            | Action::RequestInput { reasoning, .. } => reasoning.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tool_action() {
        let action: Action = serde_json::from_str(
            r#"{"type":"tool","tool_name":"shell","tool_input":{"command":"ls"},"reasoning":"look around"}"#,
        )
        .unwrap();
        match action {
            Action::Tool {
                ref tool_name,
                ref tool_input,
                ..
            } => {
                assert_eq!(tool_name, "shell");
                assert_eq!(tool_input["command"], "ls");
            }
            _ => panic!("expected tool action"),
        }
        assert_eq!(action.reasoning(), Some("look around"));
    }

    #[test]
    fn rejects_tool_action_without_input() {
        let result: Result<Action, _> =
            serde_json::from_str(r#"{"type":"tool","tool_name":"shell"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        let result: Result<Action, _> = serde_json::from_str(r#"{"type":"dance"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn phase_complete_message_is_optional() {
        let action: Action = serde_json::from_str(r#"{"type":"phase_complete"}"#).unwrap();
        assert_eq!(action.kind(), "phase_complete");
    }
}

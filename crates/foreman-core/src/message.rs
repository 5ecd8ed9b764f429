use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in a run's conversation. Append-only; insertion order is
/// significant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub run_id: Uuid,
    pub role: Role,
    pub content: String,
    /// Set on `tool`-role messages: the step this output belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "tool" => Role::Tool,
            _ => return None,
        })
    }
}

impl Message {
    /// Create a plain text message.
    pub fn text(run_id: Uuid, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            role,
            content: content.into(),
            tool_call_id: None,
            tool_name: None,
            created_at: Utc::now(),
        }
    }

    /// Create a `tool`-role message carrying a tool's JSON-encoded output.
    pub fn tool_output(
        run_id: Uuid,
        step_id: Uuid,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(step_id.to_string()),
            tool_name: Some(tool_name.into()),
            created_at: Utc::now(),
        }
    }

    /// Estimate token count for this message.
    /// Uses the usual heuristic of ~4 chars per token for English text.
    pub fn estimate_tokens(&self) -> usize {
        (self.content.len() / 4).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_is_quarter_of_length() {
        let msg = Message::text(Uuid::nil(), Role::User, "a".repeat(400));
        assert_eq!(msg.estimate_tokens(), 100);
    }

    #[test]
    fn tool_output_carries_step_linkage() {
        let step = Uuid::new_v4();
        let msg = Message::tool_output(Uuid::nil(), step, "shell", "{}");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some(step.to_string().as_str()));
        assert_eq!(msg.tool_name.as_deref(), Some("shell"));
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Context handed to a tool for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContext {
    pub run_id: Uuid,
    pub user_id: String,
    pub step_id: Uuid,
}

/// The result of executing a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Billing units consumed by this invocation. Never negative.
    #[serde(default)]
    pub credits_used: f64,
}

impl ToolOutcome {
    pub fn success(output: Value, credits_used: f64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            credits_used,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            credits_used: 0.0,
        }
    }
}

/// Trait implemented by the tool dispatch collaborator.
///
/// The supervisor never knows concrete tools; it routes by name and
/// consumes the structured outcome.
#[async_trait]
pub trait ToolRouter: Send + Sync {
    async fn execute(
        &self,
        tool_name: &str,
        tool_input: &Value,
        ctx: &ToolContext,
    ) -> crate::Result<ToolOutcome>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle status of a run.
///
/// `WaitingUser` is the only suspended state a fresh `execute()` call may
/// resume from; `Completed`, `Failed`, and `Timeout` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Executing,
    Paused,
    Cancelled,
    WaitingUser,
    Completed,
    Failed,
    Timeout,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Executing => "executing",
            RunStatus::Paused => "paused",
            RunStatus::Cancelled => "cancelled",
            RunStatus::WaitingUser => "waiting_user",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Timeout => "timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "executing" => RunStatus::Executing,
            "paused" => RunStatus::Paused,
            "cancelled" => RunStatus::Cancelled,
            "waiting_user" => RunStatus::WaitingUser,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "timeout" => RunStatus::Timeout,
            _ => return None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Timeout
        )
    }
}

/// One persisted execution of a plan for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub user_id: String,
    pub status: RunStatus,
    pub current_phase: u32,
    pub total_credits_used: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            status: RunStatus::Executing,
            current_phase: 1,
            total_credits_used: 0.0,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// Status of a single tool-invocation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pending" => StepStatus::Pending,
            "running" => StepStatus::Running,
            "completed" => StepStatus::Completed,
            "failed" => StepStatus::Failed,
            _ => return None,
        })
    }
}

/// A persisted record of one tool execution within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub step_number: u32,
    pub tool_name: String,
    pub tool_input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_output: Option<Value>,
    pub status: StepStatus,
    pub credits_used: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StepRecord {
    pub fn pending(run_id: Uuid, step_number: u32, tool_name: &str, tool_input: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            step_number,
            tool_name: tool_name.to_string(),
            tool_input,
            tool_output: None,
            status: StepStatus::Pending,
            credits_used: 0.0,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of `Supervisor::execute()` as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    WaitingUser,
    Paused,
    Failed,
}

/// The single return value of `Supervisor::execute()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn completed(final_message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            final_message: Some(final_message.into()),
            error: None,
        }
    }

    pub fn waiting_user(final_message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::WaitingUser,
            final_message: Some(final_message.into()),
            error: None,
        }
    }

    pub fn paused() -> Self {
        Self {
            status: ExecutionStatus::Paused,
            final_message: None,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Failed,
            final_message: None,
            error: Some(error.into()),
        }
    }
}

use thiserror::Error;

/// Unified error type for the entire Foreman workspace.
#[derive(Error, Debug)]
pub enum ForemanError {
    // ── Supervisor errors ──────────────────────────────────────
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credits exhausted for user {0}")]
    CreditsExhausted(String),

    #[error("decision failed: {0}")]
    Decision(String),

    #[error("action execution failed: {action}: {reason}")]
    ActionExecution { action: String, reason: String },

    // ── LLM provider errors ────────────────────────────────────
    #[error("llm provider error: {0}")]
    LlmProvider(String),

    #[error("llm rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    // ── Tool errors ────────────────────────────────────────────
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {tool}: {reason}")]
    ToolExecution { tool: String, reason: String },

    // ── Persistence errors ─────────────────────────────────────
    #[error("store error: {0}")]
    Store(String),

    #[error("run not found: {0}")]
    RunNotFound(uuid::Uuid),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ForemanError>;

use async_trait::async_trait;
use foreman_core::Result;
use serde::{Deserialize, Serialize};

/// Role of one message in a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
}

/// One message in the conversation sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
        }
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// The model to use, e.g. "anthropic/claude-sonnet-4-20250514". The
    /// router strips the provider prefix before dispatch.
    pub model: String,
    /// Conversation history.
    pub messages: Vec<ChatMessage>,
    /// System prompt (separate from messages for providers that support it).
    pub system: Option<String>,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature.
    pub temperature: f32,
}

/// A completed response from an LLM.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text. `None` when the provider returned an empty body.
    pub content: Option<String>,
    /// The model that actually served the request.
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Billed cost of this call as reported by the provider, USD.
    pub cost_usd: f64,
}

/// Trait implemented by each LLM provider (Anthropic, OpenAI, local, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, e.g. "anthropic". Matched against the prefix of
    /// "provider/model" strings.
    fn name(&self) -> &str;

    /// List available models.
    fn models(&self) -> Vec<String>;

    /// Send a request and wait for the full response.
    async fn complete(&self, request: &LlmRequest) -> Result<Completion>;
}

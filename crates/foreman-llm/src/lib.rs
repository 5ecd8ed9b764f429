//! # foreman-llm
//!
//! Abstraction layer over LLM providers. Handles retry with backoff,
//! per-provider circuit breaking, and automatic failover to a fallback model.

pub mod mock;
pub mod provider;
pub mod router;

pub use mock::MockProvider;
pub use provider::{ChatMessage, ChatRole, Completion, LlmProvider, LlmRequest};
pub use router::ProviderRouter;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-call LLM usage record, persisted for billing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: Uuid,
    pub run_id: Uuid,
    pub user_id: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub input_cost_usd: f64,
    pub output_cost_usd: f64,
    /// Stable key identifying the logical call, `"{run_id}:{cycle}"`.
    /// A retried decision cycle writes the same key, so downstream billing
    /// can deduplicate.
    pub request_key: String,
    pub created_at: DateTime<Utc>,
}

/// A user's credit balance row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalance {
    pub user_id: String,
    pub available_credits: f64,
    pub granted_credits: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

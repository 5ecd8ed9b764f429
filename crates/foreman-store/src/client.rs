use async_trait::async_trait;
use uuid::Uuid;

use foreman_core::{
    CreditBalance, Message, Result, RunEvent, RunRecord, RunStatus, StepRecord, TokenRecord,
};

/// Durable storage operations the supervisor depends on.
///
/// The supervisor receives this as a trait object so tests can substitute
/// an in-memory database or a failing stub.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    // ── Runs ───────────────────────────────────────────────────

    async fn insert_run(&self, run: &RunRecord) -> Result<()>;

    /// Fetch a run by id. Returns `RunNotFound` if no row exists.
    async fn fetch_run(&self, run_id: Uuid) -> Result<RunRecord>;

    /// Update a run's status. Terminal statuses also set `completed_at`.
    async fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    async fn set_run_phase(&self, run_id: Uuid, phase: u32) -> Result<()>;

    // ── Steps ──────────────────────────────────────────────────

    async fn insert_step(&self, step: &StepRecord) -> Result<()>;

    /// Overwrite a step's mutable fields (status, output, error, credits).
    async fn update_step(&self, step: &StepRecord) -> Result<()>;

    /// Completed steps for a run, oldest first.
    async fn list_completed_steps(&self, run_id: Uuid) -> Result<Vec<StepRecord>>;

    /// Number of steps recorded for a run, regardless of status. Used to
    /// keep step numbering unique when a suspended run resumes.
    async fn count_steps(&self, run_id: Uuid) -> Result<u32>;

    // ── Messages ───────────────────────────────────────────────

    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// All messages for a run, oldest first.
    async fn list_messages(&self, run_id: Uuid) -> Result<Vec<Message>>;

    // ── Activity log ───────────────────────────────────────────

    async fn insert_task_log(&self, event: &RunEvent) -> Result<()>;

    // ── Billing ────────────────────────────────────────────────

    async fn insert_token_record(&self, record: &TokenRecord) -> Result<()>;

    /// Usage records for a run, oldest first.
    async fn list_token_records(&self, run_id: Uuid) -> Result<Vec<TokenRecord>>;

    async fn fetch_balance(&self, user_id: &str) -> Result<Option<CreditBalance>>;

    /// Create a balance row with the given starting grant.
    async fn create_balance(&self, user_id: &str, grant: f64) -> Result<CreditBalance>;

    /// Subtract credits from the user's balance and add the same amount to
    /// the run's total, in one transaction. Returns the remaining balance.
    async fn deduct_credits(&self, user_id: &str, run_id: Uuid, amount: f64) -> Result<f64>;
}

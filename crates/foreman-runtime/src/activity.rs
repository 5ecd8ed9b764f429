use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use foreman_core::{RunEvent, RunEventBus, RunEventKind};
use foreman_store::PersistenceClient;

/// Dual-writes run activity: a durable log row plus a publish on the
/// run's real-time channel.
///
/// Logging is a side effect, never a reason to abort the run. Persistence
/// failures are reported through tracing and swallowed.
pub struct ActivityLogger {
    store: Arc<dyn PersistenceClient>,
    bus: RunEventBus,
}

impl ActivityLogger {
    pub fn new(store: Arc<dyn PersistenceClient>, bus: RunEventBus) -> Self {
        Self { store, bus }
    }

    pub fn bus(&self) -> &RunEventBus {
        &self.bus
    }

    pub async fn log(&self, event: RunEvent) {
        if let Err(e) = self.store.insert_task_log(&event).await {
            warn!(run = %event.run_id, error = %e, "failed to persist activity event");
        }
        self.bus.publish(event);
    }

    pub async fn info(&self, run_id: Uuid, message: impl Into<String>) {
        self.log(RunEvent::new(run_id, RunEventKind::Info, message))
            .await;
    }

    pub async fn success(&self, run_id: Uuid, message: impl Into<String>) {
        self.log(RunEvent::new(run_id, RunEventKind::Success, message))
            .await;
    }

    pub async fn error(&self, run_id: Uuid, message: impl Into<String>) {
        self.log(RunEvent::new(run_id, RunEventKind::Error, message))
            .await;
    }

    pub async fn tool_success(&self, run_id: Uuid, tool_name: &str, credits_used: f64) {
        self.log(
            RunEvent::new(
                run_id,
                RunEventKind::ToolSuccess,
                format!("tool '{}' completed", tool_name),
            )
            .with_metadata(json!({"tool": tool_name, "credits_used": credits_used})),
        )
        .await;
    }

    pub async fn tool_error(&self, run_id: Uuid, tool_name: &str, error: &str) {
        self.log(
            RunEvent::new(
                run_id,
                RunEventKind::ToolError,
                format!("tool '{}' failed: {}", tool_name, error),
            )
            .with_metadata(json!({"tool": tool_name})),
        )
        .await;
    }

    pub async fn phase_advance(&self, run_id: Uuid, from: u32, to: u32, message: Option<&str>) {
        self.log(
            RunEvent::new(
                run_id,
                RunEventKind::PhaseAdvance,
                message
                    .map(String::from)
                    .unwrap_or_else(|| format!("phase {} complete", from)),
            )
            .with_metadata(json!({"from_phase": from, "to_phase": to})),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use foreman_core::{
        CreditBalance, ForemanError, Message, Result, RunRecord, RunStatus, StepRecord,
        TokenRecord,
    };

    /// A store whose task log writes always fail.
    struct BrokenStore;

    #[async_trait]
    impl PersistenceClient for BrokenStore {
        async fn insert_run(&self, _: &RunRecord) -> Result<()> {
            Ok(())
        }
        async fn fetch_run(&self, run_id: Uuid) -> Result<RunRecord> {
            Err(ForemanError::RunNotFound(run_id))
        }
        async fn update_run_status(
            &self,
            _: Uuid,
            _: RunStatus,
            _: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }
        async fn set_run_phase(&self, _: Uuid, _: u32) -> Result<()> {
            Ok(())
        }
        async fn insert_step(&self, _: &StepRecord) -> Result<()> {
            Ok(())
        }
        async fn update_step(&self, _: &StepRecord) -> Result<()> {
            Ok(())
        }
        async fn list_completed_steps(&self, _: Uuid) -> Result<Vec<StepRecord>> {
            Ok(vec![])
        }
        async fn count_steps(&self, _: Uuid) -> Result<u32> {
            Ok(0)
        }
        async fn insert_message(&self, _: &Message) -> Result<()> {
            Ok(())
        }
        async fn list_messages(&self, _: Uuid) -> Result<Vec<Message>> {
            Ok(vec![])
        }
        async fn insert_task_log(&self, _: &RunEvent) -> Result<()> {
            Err(ForemanError::Store("disk full".into()))
        }
        async fn insert_token_record(&self, _: &TokenRecord) -> Result<()> {
            Ok(())
        }
        async fn list_token_records(&self, _: Uuid) -> Result<Vec<TokenRecord>> {
            Ok(vec![])
        }
        async fn fetch_balance(&self, _: &str) -> Result<Option<CreditBalance>> {
            Ok(None)
        }
        async fn create_balance(&self, user_id: &str, grant: f64) -> Result<CreditBalance> {
            let now = chrono::Utc::now();
            Ok(CreditBalance {
                user_id: user_id.to_string(),
                available_credits: grant,
                granted_credits: grant,
                created_at: now,
                updated_at: now,
            })
        }
        async fn deduct_credits(&self, _: &str, _: Uuid, _: f64) -> Result<f64> {
            Ok(0.0)
        }
    }

    #[tokio::test]
    async fn persistence_failure_still_publishes() {
        let logger = ActivityLogger::new(Arc::new(BrokenStore), RunEventBus::default());
        let run_id = Uuid::new_v4();
        let mut rx = logger.bus().subscribe(run_id);

        logger.info(run_id, "still flowing").await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.message, "still flowing");
    }

    #[tokio::test]
    async fn tool_events_carry_metadata() {
        let store = Arc::new(foreman_store::SqliteStore::open_in_memory().unwrap());
        let logger = ActivityLogger::new(store, RunEventBus::default());
        let run_id = Uuid::new_v4();
        let mut rx = logger.bus().subscribe(run_id);

        logger.tool_success(run_id, "shell", 2.5).await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, RunEventKind::ToolSuccess);
        let meta = event.metadata.unwrap();
        assert_eq!(meta["tool"], "shell");
        assert_eq!(meta["credits_used"], 2.5);
    }
}

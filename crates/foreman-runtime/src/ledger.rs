use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::decision::Decision;
use foreman_core::{Result, TokenRecord};
use foreman_store::PersistenceClient;

/// Fraction of a decision's billed cost attributed to input tokens when
/// the provider reports a single total.
const INPUT_COST_SHARE: f64 = 0.3;

/// Billing operations the supervisor performs: balance checks with
/// first-touch provisioning, atomic deduction, and usage records.
pub struct CreditLedger {
    store: Arc<dyn PersistenceClient>,
    default_grant: f64,
}

impl CreditLedger {
    pub fn new(store: Arc<dyn PersistenceClient>, default_grant: f64) -> Self {
        Self {
            store,
            default_grant,
        }
    }

    /// Whether the user can spend. A user with no balance row gets one
    /// created with the default grant and is treated as sufficient.
    pub async fn check_balance(&self, user_id: &str) -> Result<bool> {
        match self.store.fetch_balance(user_id).await? {
            Some(balance) => Ok(balance.available_credits > 0.0),
            None => {
                info!(user = user_id, grant = self.default_grant, "provisioning credit balance");
                self.store
                    .create_balance(user_id, self.default_grant)
                    .await?;
                Ok(true)
            }
        }
    }

    /// Deduct credits from the user and add them to the run's total in a
    /// single transaction. Returns the remaining balance.
    pub async fn deduct(&self, user_id: &str, run_id: Uuid, amount: f64) -> Result<f64> {
        self.store.deduct_credits(user_id, run_id, amount).await
    }

    /// Persist a usage record for one decision call, splitting the
    /// provider-reported cost across input and output. The request key is
    /// derived from the run and cycle so a retried cycle writes the same
    /// key and downstream billing can deduplicate.
    pub async fn record_usage(
        &self,
        run_id: Uuid,
        user_id: &str,
        cycle: u32,
        decision: &Decision,
    ) -> Result<()> {
        let record = TokenRecord {
            id: Uuid::new_v4(),
            run_id,
            user_id: user_id.to_string(),
            model: decision.model.clone(),
            input_tokens: decision.input_tokens,
            output_tokens: decision.output_tokens,
            input_cost_usd: decision.cost_usd * INPUT_COST_SHARE,
            output_cost_usd: decision.cost_usd * (1.0 - INPUT_COST_SHARE),
            request_key: format!("{}:{}", run_id, cycle),
            created_at: Utc::now(),
        };
        self.store.insert_token_record(&record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::Action;
    use foreman_store::SqliteStore;

    fn ledger_with_store() -> (CreditLedger, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let ledger = CreditLedger::new(store.clone(), 10_000.0);
        (ledger, store)
    }

    fn decision(cost_usd: f64) -> Decision {
        Decision {
            action: Action::TaskComplete {
                message: "done".into(),
                reasoning: None,
            },
            model: "mock/test-model".into(),
            input_tokens: 1200,
            output_tokens: 300,
            cost_usd,
        }
    }

    #[tokio::test]
    async fn first_touch_provisions_default_grant() {
        let (ledger, store) = ledger_with_store();

        assert!(ledger.check_balance("new-user").await.unwrap());
        let balance = store.fetch_balance("new-user").await.unwrap().unwrap();
        assert_eq!(balance.available_credits, 10_000.0);

        // Second call reads the existing row instead of re-provisioning
        assert!(ledger.check_balance("new-user").await.unwrap());
        let again = store.fetch_balance("new-user").await.unwrap().unwrap();
        assert_eq!(again.granted_credits, 10_000.0);
    }

    #[tokio::test]
    async fn exhausted_balance_reports_insufficient() {
        let (ledger, store) = ledger_with_store();
        store.create_balance("broke", 0.0).await.unwrap();
        assert!(!ledger.check_balance("broke").await.unwrap());
    }

    #[tokio::test]
    async fn usage_record_splits_provider_cost() {
        let (ledger, store) = ledger_with_store();
        let run = foreman_core::RunRecord::new("u");
        store.insert_run(&run).await.unwrap();

        ledger
            .record_usage(run.id, "u", 3, &decision(10.0))
            .await
            .unwrap();

        let records = store.list_token_records(run.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].input_cost_usd - 3.0).abs() < 1e-9);
        assert!((records[0].output_cost_usd - 7.0).abs() < 1e-9);
        assert_eq!(records[0].request_key, format!("{}:3", run.id));
    }

    #[tokio::test]
    async fn request_key_tracks_the_cycle() {
        let (ledger, store) = ledger_with_store();
        let run = foreman_core::RunRecord::new("u");
        store.insert_run(&run).await.unwrap();

        ledger.record_usage(run.id, "u", 1, &decision(0.5)).await.unwrap();
        ledger.record_usage(run.id, "u", 2, &decision(0.5)).await.unwrap();

        let records = store.list_token_records(run.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].request_key, records[1].request_key);
    }
}

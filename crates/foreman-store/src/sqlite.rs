use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::client::PersistenceClient;
use foreman_core::{
    CreditBalance, ForemanError, Message, Result, Role, RunEvent, RunRecord, RunStatus,
    StepRecord, StepStatus, TokenRecord,
};

/// SQLite-backed persistence.
///
/// All access goes through a single connection behind a mutex. Queries are
/// short and never held across an await point.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

fn store_err(e: impl std::fmt::Display) -> ForemanError {
    ForemanError::Store(e.to_string())
}

fn parse_uuid(s: &str) -> std::result::Result<Uuid, ForemanError> {
    Uuid::parse_str(s).map_err(store_err)
}

fn parse_ts(s: &str) -> std::result::Result<DateTime<Utc>, ForemanError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(store_err)
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(?path, "opening store");

        let conn = Connection::open(path).map_err(store_err)?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(store_err)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL,
                current_phase INTEGER NOT NULL DEFAULT 1,
                total_credits_used REAL NOT NULL DEFAULT 0.0,
                error_message TEXT,
                created_at TEXT NOT NULL,
                completed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS steps (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL REFERENCES runs(id),
                step_number INTEGER NOT NULL,
                tool_name TEXT NOT NULL,
                tool_input TEXT NOT NULL,
                tool_output TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                credits_used REAL NOT NULL DEFAULT 0.0,
                error_message TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL REFERENCES runs(id),
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tool_call_id TEXT,
                tool_name TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS task_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                message TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS token_usage (
                id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                model TEXT NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                input_cost_usd REAL NOT NULL,
                output_cost_usd REAL NOT NULL,
                request_key TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS credit_balances (
                user_id TEXT PRIMARY KEY,
                available_credits REAL NOT NULL,
                granted_credits REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_steps_run ON steps(run_id);
            CREATE INDEX IF NOT EXISTS idx_messages_run ON messages(run_id);
            CREATE INDEX IF NOT EXISTS idx_task_logs_run ON task_logs(run_id);
            CREATE INDEX IF NOT EXISTS idx_token_usage_key ON token_usage(request_key);
            ",
        )
        .map_err(store_err)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(Path::new(":memory:"))
    }
}

#[async_trait]
impl PersistenceClient for SqliteStore {
    // ── Runs ───────────────────────────────────────────────────

    async fn insert_run(&self, run: &RunRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO runs (id, user_id, status, current_phase, total_credits_used, error_message, created_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                run.id.to_string(),
                run.user_id,
                run.status.as_str(),
                run.current_phase as i64,
                run.total_credits_used,
                run.error_message,
                run.created_at.to_rfc3339(),
                run.completed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn fetch_run(&self, run_id: Uuid) -> Result<RunRecord> {
        let conn = self.conn.lock();
        let row: Option<(String, String, String, i64, f64, Option<String>, String, Option<String>)> =
            conn.query_row(
                "SELECT id, user_id, status, current_phase, total_credits_used, error_message, created_at, completed_at
                 FROM runs WHERE id = ?1",
                rusqlite::params![run_id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )
            .optional()
            .map_err(store_err)?;

        let (id, user_id, status, phase, credits, error_message, created_at, completed_at) =
            row.ok_or(ForemanError::RunNotFound(run_id))?;

        Ok(RunRecord {
            id: parse_uuid(&id)?,
            user_id,
            status: RunStatus::parse(&status)
                .ok_or_else(|| store_err(format!("unknown run status '{}'", status)))?,
            current_phase: phase as u32,
            total_credits_used: credits,
            error_message,
            created_at: parse_ts(&created_at)?,
            completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
        })
    }

    async fn update_run_status(
        &self,
        run_id: Uuid,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let completed_at = status.is_terminal().then(|| Utc::now().to_rfc3339());
        let rows = conn
            .execute(
                "UPDATE runs SET status = ?2, error_message = ?3, completed_at = COALESCE(?4, completed_at) WHERE id = ?1",
                rusqlite::params![run_id.to_string(), status.as_str(), error_message, completed_at],
            )
            .map_err(store_err)?;
        if rows == 0 {
            return Err(ForemanError::RunNotFound(run_id));
        }
        Ok(())
    }

    async fn set_run_phase(&self, run_id: Uuid, phase: u32) -> Result<()> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE runs SET current_phase = ?2 WHERE id = ?1",
                rusqlite::params![run_id.to_string(), phase as i64],
            )
            .map_err(store_err)?;
        if rows == 0 {
            return Err(ForemanError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ── Steps ──────────────────────────────────────────────────

    async fn insert_step(&self, step: &StepRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO steps (id, run_id, step_number, tool_name, tool_input, tool_output, status, credits_used, error_message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                step.id.to_string(),
                step.run_id.to_string(),
                step.step_number as i64,
                step.tool_name,
                serde_json::to_string(&step.tool_input)?,
                step.tool_output
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                step.status.as_str(),
                step.credits_used,
                step.error_message,
                step.created_at.to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_step(&self, step: &StepRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE steps SET status = ?2, tool_output = ?3, credits_used = ?4, error_message = ?5 WHERE id = ?1",
            rusqlite::params![
                step.id.to_string(),
                step.status.as_str(),
                step.tool_output
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                step.credits_used,
                step.error_message,
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_completed_steps(&self, run_id: Uuid) -> Result<Vec<StepRecord>> {
        let rows: Vec<(String, i64, String, String, Option<String>, String, f64, Option<String>, String)> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, step_number, tool_name, tool_input, tool_output, status, credits_used, error_message, created_at
                     FROM steps WHERE run_id = ?1 AND status = 'completed' ORDER BY created_at, step_number",
                )
                .map_err(store_err)?;
            stmt.query_map(rusqlite::params![run_id.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?
        };

        let mut steps = Vec::with_capacity(rows.len());
        for (id, number, tool_name, input, output, status, credits, error_message, created_at) in
            rows
        {
            steps.push(StepRecord {
                id: parse_uuid(&id)?,
                run_id,
                step_number: number as u32,
                tool_name,
                tool_input: serde_json::from_str(&input)?,
                tool_output: output.as_deref().map(serde_json::from_str).transpose()?,
                status: StepStatus::parse(&status)
                    .ok_or_else(|| store_err(format!("unknown step status '{}'", status)))?,
                credits_used: credits,
                error_message,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(steps)
    }

    async fn count_steps(&self, run_id: Uuid) -> Result<u32> {
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM steps WHERE run_id = ?1",
                rusqlite::params![run_id.to_string()],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as u32)
    }

    // ── Messages ───────────────────────────────────────────────

    async fn insert_message(&self, message: &Message) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, run_id, role, content, tool_call_id, tool_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                message.id.to_string(),
                message.run_id.to_string(),
                message.role.as_str(),
                message.content,
                message.tool_call_id,
                message.tool_name,
                message.created_at.to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_messages(&self, run_id: Uuid) -> Result<Vec<Message>> {
        let rows: Vec<(String, String, String, Option<String>, Option<String>, String)> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, role, content, tool_call_id, tool_name, created_at
                     FROM messages WHERE run_id = ?1 ORDER BY created_at, rowid",
                )
                .map_err(store_err)?;
            stmt.query_map(rusqlite::params![run_id.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?
        };

        let mut messages = Vec::with_capacity(rows.len());
        for (id, role, content, tool_call_id, tool_name, created_at) in rows {
            messages.push(Message {
                id: parse_uuid(&id)?,
                run_id,
                role: Role::parse(&role)
                    .ok_or_else(|| store_err(format!("unknown role '{}'", role)))?,
                content,
                tool_call_id,
                tool_name,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(messages)
    }

    // ── Activity log ───────────────────────────────────────────

    async fn insert_task_log(&self, event: &RunEvent) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO task_logs (run_id, kind, message, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                event.run_id.to_string(),
                event.kind.as_str(),
                event.message,
                event
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                event.timestamp.to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    // ── Billing ────────────────────────────────────────────────

    async fn insert_token_record(&self, record: &TokenRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO token_usage (id, run_id, user_id, model, input_tokens, output_tokens, input_cost_usd, output_cost_usd, request_key, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                record.id.to_string(),
                record.run_id.to_string(),
                record.user_id,
                record.model,
                record.input_tokens as i64,
                record.output_tokens as i64,
                record.input_cost_usd,
                record.output_cost_usd,
                record.request_key,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_token_records(&self, run_id: Uuid) -> Result<Vec<TokenRecord>> {
        let rows: Vec<(String, String, String, i64, i64, f64, f64, String, String)> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, model, input_tokens, output_tokens, input_cost_usd, output_cost_usd, request_key, created_at
                     FROM token_usage WHERE run_id = ?1 ORDER BY created_at, request_key",
                )
                .map_err(store_err)?;
            stmt.query_map(rusqlite::params![run_id.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            })
            .map_err(store_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(store_err)?
        };

        let mut records = Vec::with_capacity(rows.len());
        for (id, user_id, model, input, output, input_cost, output_cost, request_key, created_at) in
            rows
        {
            records.push(TokenRecord {
                id: parse_uuid(&id)?,
                run_id,
                user_id,
                model,
                input_tokens: input as u32,
                output_tokens: output as u32,
                input_cost_usd: input_cost,
                output_cost_usd: output_cost,
                request_key,
                created_at: parse_ts(&created_at)?,
            });
        }
        Ok(records)
    }

    async fn fetch_balance(&self, user_id: &str) -> Result<Option<CreditBalance>> {
        let conn = self.conn.lock();
        let row: Option<(f64, f64, String, String)> = conn
            .query_row(
                "SELECT available_credits, granted_credits, created_at, updated_at
                 FROM credit_balances WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(store_err)?;

        match row {
            Some((available, granted, created_at, updated_at)) => Ok(Some(CreditBalance {
                user_id: user_id.to_string(),
                available_credits: available,
                granted_credits: granted,
                created_at: parse_ts(&created_at)?,
                updated_at: parse_ts(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    async fn create_balance(&self, user_id: &str, grant: f64) -> Result<CreditBalance> {
        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO credit_balances (user_id, available_credits, granted_credits, created_at, updated_at)
             VALUES (?1, ?2, ?2, ?3, ?3)",
            rusqlite::params![user_id, grant, now.to_rfc3339()],
        )
        .map_err(store_err)?;
        Ok(CreditBalance {
            user_id: user_id.to_string(),
            available_credits: grant,
            granted_credits: grant,
            created_at: now,
            updated_at: now,
        })
    }

    async fn deduct_credits(&self, user_id: &str, run_id: Uuid, amount: f64) -> Result<f64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(store_err)?;
        let now = Utc::now().to_rfc3339();

        let rows = tx
            .execute(
                "UPDATE credit_balances SET available_credits = available_credits - ?2, updated_at = ?3 WHERE user_id = ?1",
                rusqlite::params![user_id, amount, now],
            )
            .map_err(store_err)?;
        if rows == 0 {
            return Err(ForemanError::Configuration(format!(
                "no credit balance for user '{}'",
                user_id
            )));
        }

        tx.execute(
            "UPDATE runs SET total_credits_used = total_credits_used + ?2 WHERE id = ?1",
            rusqlite::params![run_id.to_string(), amount],
        )
        .map_err(store_err)?;

        let remaining: f64 = tx
            .query_row(
                "SELECT available_credits FROM credit_balances WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| row.get(0),
            )
            .map_err(store_err)?;

        tx.commit().map_err(store_err)?;
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::{RunEventKind, StepStatus};
    use serde_json::json;

    async fn store_with_run() -> (SqliteStore, RunRecord) {
        let store = SqliteStore::open_in_memory().unwrap();
        let run = RunRecord::new("user-1");
        store.insert_run(&run).await.unwrap();
        (store, run)
    }

    #[tokio::test]
    async fn run_round_trip() {
        let (store, run) = store_with_run().await;
        let fetched = store.fetch_run(run.id).await.unwrap();
        assert_eq!(fetched.id, run.id);
        assert_eq!(fetched.user_id, "user-1");
        assert_eq!(fetched.status, RunStatus::Executing);
        assert_eq!(fetched.current_phase, 1);
    }

    #[tokio::test]
    async fn missing_run_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.fetch_run(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ForemanError::RunNotFound(_))));
    }

    #[tokio::test]
    async fn terminal_status_sets_completed_at() {
        let (store, run) = store_with_run().await;
        store
            .update_run_status(run.id, RunStatus::Completed, None)
            .await
            .unwrap();
        let fetched = store.fetch_run(run.id).await.unwrap();
        assert_eq!(fetched.status, RunStatus::Completed);
        assert!(fetched.completed_at.is_some());
    }

    #[tokio::test]
    async fn suspension_leaves_completed_at_unset() {
        let (store, run) = store_with_run().await;
        store
            .update_run_status(run.id, RunStatus::WaitingUser, None)
            .await
            .unwrap();
        let fetched = store.fetch_run(run.id).await.unwrap();
        assert!(fetched.completed_at.is_none());
    }

    #[tokio::test]
    async fn step_lifecycle() {
        let (store, run) = store_with_run().await;
        let mut step = StepRecord::pending(run.id, 1, "shell", json!({"command": "ls"}));
        store.insert_step(&step).await.unwrap();

        step.status = StepStatus::Completed;
        step.tool_output = Some(json!({"stdout": "ok"}));
        step.credits_used = 2.5;
        store.update_step(&step).await.unwrap();

        let steps = store.list_completed_steps(run.id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].tool_name, "shell");
        assert_eq!(steps[0].tool_output, Some(json!({"stdout": "ok"})));
        assert_eq!(steps[0].credits_used, 2.5);
    }

    #[tokio::test]
    async fn failed_steps_are_not_listed_as_completed() {
        let (store, run) = store_with_run().await;
        let mut step = StepRecord::pending(run.id, 1, "shell", json!({}));
        store.insert_step(&step).await.unwrap();
        step.status = StepStatus::Failed;
        step.error_message = Some("boom".into());
        store.update_step(&step).await.unwrap();

        assert!(store.list_completed_steps(run.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_come_back_in_order() {
        let (store, run) = store_with_run().await;
        for i in 0..3 {
            let msg = Message::text(run.id, Role::User, format!("msg {}", i));
            store.insert_message(&msg).await.unwrap();
        }
        let messages = store.list_messages(run.id).await.unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg 0");
        assert_eq!(messages[2].content, "msg 2");
    }

    #[tokio::test]
    async fn task_log_insert_does_not_fail() {
        let (store, run) = store_with_run().await;
        let event = RunEvent::new(run.id, RunEventKind::Info, "started")
            .with_metadata(json!({"phase": 1}));
        store.insert_task_log(&event).await.unwrap();
    }

    #[tokio::test]
    async fn balance_create_and_fetch() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.fetch_balance("u").await.unwrap().is_none());

        let balance = store.create_balance("u", 10_000.0).await.unwrap();
        assert_eq!(balance.available_credits, 10_000.0);
        assert_eq!(balance.granted_credits, 10_000.0);

        let fetched = store.fetch_balance("u").await.unwrap().unwrap();
        assert_eq!(fetched.available_credits, 10_000.0);
    }

    #[tokio::test]
    async fn deduction_updates_balance_and_run_total() {
        let (store, run) = store_with_run().await;
        store.create_balance("user-1", 100.0).await.unwrap();

        let remaining = store.deduct_credits("user-1", run.id, 30.0).await.unwrap();
        assert_eq!(remaining, 70.0);

        let fetched = store.fetch_run(run.id).await.unwrap();
        assert_eq!(fetched.total_credits_used, 30.0);
    }

    #[tokio::test]
    async fn deduction_without_balance_row_fails() {
        let (store, run) = store_with_run().await;
        let result = store.deduct_credits("ghost", run.id, 1.0).await;
        assert!(matches!(result, Err(ForemanError::Configuration(_))));
    }

    #[tokio::test]
    async fn step_count_covers_all_statuses() {
        let (store, run) = store_with_run().await;
        assert_eq!(store.count_steps(run.id).await.unwrap(), 0);

        let mut failed = StepRecord::pending(run.id, 1, "shell", json!({}));
        store.insert_step(&failed).await.unwrap();
        failed.status = StepStatus::Failed;
        store.update_step(&failed).await.unwrap();

        let completed = StepRecord::pending(run.id, 2, "shell", json!({}));
        store.insert_step(&completed).await.unwrap();

        assert_eq!(store.count_steps(run.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn token_record_round_trip() {
        let (store, run) = store_with_run().await;
        let record = TokenRecord {
            id: Uuid::new_v4(),
            run_id: run.id,
            user_id: "user-1".into(),
            model: "anthropic/claude-sonnet-4-20250514".into(),
            input_tokens: 1200,
            output_tokens: 300,
            input_cost_usd: 0.0036,
            output_cost_usd: 0.0045,
            request_key: format!("{}:3", run.id),
            created_at: Utc::now(),
        };
        store.insert_token_record(&record).await.unwrap();

        let records = store.list_token_records(run.id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].request_key, record.request_key);
        assert_eq!(records[0].input_tokens, 1200);
        assert_eq!(records[0].output_cost_usd, 0.0045);
    }
}

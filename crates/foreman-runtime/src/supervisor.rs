use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::activity::ActivityLogger;
use crate::conversation::Conversation;
use crate::decision::DecisionEngine;
use crate::ledger::CreditLedger;
use foreman_config::schema::SupervisorConfig;
use foreman_core::{
    Action, ExecutionResult, ForemanError, Message, Plan, Result, Role, RunStatus, StepRecord,
    StepStatus, ToolContext, ToolRouter,
};
use foreman_store::PersistenceClient;

/// Drives one run through its plan: a bounded loop of decide, act,
/// persist, until the run completes, suspends, or fails.
///
/// One instance owns one run. The conversation buffer is private to the
/// instance; run, step, and balance records are shared state reached only
/// through the store.
pub struct Supervisor {
    store: Arc<dyn PersistenceClient>,
    engine: DecisionEngine,
    ledger: CreditLedger,
    tools: Arc<dyn ToolRouter>,
    activity: ActivityLogger,
    config: SupervisorConfig,
    run_id: Uuid,
    user_id: String,
    plan: Plan,
    current_phase: u32,
    step_count: u32,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn PersistenceClient>,
        engine: DecisionEngine,
        ledger: CreditLedger,
        tools: Arc<dyn ToolRouter>,
        activity: ActivityLogger,
        config: SupervisorConfig,
        run_id: Uuid,
        user_id: impl Into<String>,
        plan: Plan,
    ) -> Self {
        Self {
            store,
            engine,
            ledger,
            tools,
            activity,
            config,
            run_id,
            user_id: user_id.into(),
            plan,
            current_phase: 1,
            step_count: 0,
        }
    }

    /// Resume from a phase other than the first.
    pub fn with_phase(mut self, phase: u32) -> Self {
        self.current_phase = phase;
        self
    }

    /// Run the loop to a terminal or suspended state.
    ///
    /// Never panics outward and never returns `Err`: any error inside a
    /// cycle marks the run `failed` and comes back as a failed result.
    pub async fn execute(&mut self) -> ExecutionResult {
        match self.run_loop().await {
            Ok(result) => result,
            Err(e) => {
                let reason = e.to_string();
                warn!(run = %self.run_id, error = %reason, "run failed");
                if let Err(update_err) = self
                    .store
                    .update_run_status(self.run_id, RunStatus::Failed, Some(&reason))
                    .await
                {
                    warn!(run = %self.run_id, error = %update_err, "failed to persist run failure");
                }
                self.activity.error(self.run_id, &reason).await;
                ExecutionResult::failed(reason)
            }
        }
    }

    async fn run_loop(&mut self) -> Result<ExecutionResult> {
        self.plan.validate()?;

        let chat = self.store.list_messages(self.run_id).await?;
        let steps = self.store.list_completed_steps(self.run_id).await?;
        let mut conversation =
            Conversation::load(chat, &steps, self.config.max_context_tokens);

        // Resume-safe counters: step numbers and request keys continue
        // where the previous execution left off.
        self.step_count = self.store.count_steps(self.run_id).await?;
        let prior_cycles = self.store.list_token_records(self.run_id).await?.len() as u32;

        info!(
            run = %self.run_id,
            phase = self.current_phase,
            history = conversation.len(),
            prior_cycles,
            "starting supervisor loop"
        );

        for offset in 1..=self.config.max_iterations {
            let cycle = prior_cycles + offset;
            // 1. Cancellation check, polled once per cycle
            let run = self.store.fetch_run(self.run_id).await?;
            if matches!(run.status, RunStatus::Cancelled | RunStatus::Paused) {
                info!(run = %self.run_id, status = run.status.as_str(), "run suspended by caller");
                return Ok(ExecutionResult::paused());
            }

            // 2. Credit check with first-touch provisioning
            if !self.ledger.check_balance(&self.user_id).await? {
                return Err(ForemanError::CreditsExhausted(self.user_id.clone()));
            }

            // 3. Phase lookup
            let phase = self
                .plan
                .phase(self.current_phase)
                .ok_or_else(|| {
                    ForemanError::Configuration(format!(
                        "phase {} not found in plan",
                        self.current_phase
                    ))
                })?
                .clone();

            // 4. Decide
            let decision = self.engine.decide(&self.plan, &phase, &conversation).await?;
            self.ledger
                .record_usage(self.run_id, &self.user_id, cycle, &decision)
                .await?;

            // 5. Log reasoning, best effort
            if let Some(reasoning) = decision.action.reasoning() {
                self.activity.info(self.run_id, reasoning).await;
            }

            info!(
                run = %self.run_id,
                cycle,
                phase = self.current_phase,
                action = decision.action.kind(),
                "decision made"
            );

            // 6 + 7. Act and handle transitions
            match decision.action {
                Action::Tool {
                    tool_name,
                    tool_input,
                    ..
                } => {
                    self.execute_tool(&mut conversation, &tool_name, tool_input)
                        .await?;
                }
                Action::Message { message, .. } => {
                    let msg = Message::text(self.run_id, Role::Assistant, message);
                    self.store.insert_message(&msg).await?;
                    conversation.push(msg);
                }
                Action::TaskComplete { message, .. } => {
                    self.activity.success(self.run_id, &message).await;
                    self.store
                        .update_run_status(self.run_id, RunStatus::Completed, None)
                        .await?;
                    return Ok(ExecutionResult::completed(message));
                }
                Action::RequestInput { message, .. } => {
                    self.activity.info(self.run_id, &message).await;
                    self.store
                        .update_run_status(self.run_id, RunStatus::WaitingUser, None)
                        .await?;
                    return Ok(ExecutionResult::waiting_user(message));
                }
                Action::PhaseComplete { message, .. } => {
                    let from = self.current_phase;
                    self.current_phase += 1;
                    self.activity
                        .phase_advance(self.run_id, from, self.current_phase, message.as_deref())
                        .await;

                    if self.current_phase > self.plan.last_phase_number() {
                        // Last phase done: the run completes in this cycle
                        self.store
                            .update_run_status(self.run_id, RunStatus::Completed, None)
                            .await?;
                        let final_message = message
                            .unwrap_or_else(|| "all phases complete".to_string());
                        return Ok(ExecutionResult::completed(final_message));
                    }
                    self.store
                        .set_run_phase(self.run_id, self.current_phase)
                        .await?;
                }
            }

            // 8. Trim conversation if over budget
            conversation.trim();

            // 9. Yield between cycles
            tokio::time::sleep(Duration::from_millis(self.config.cycle_delay_ms)).await;
        }

        warn!(
            run = %self.run_id,
            max = self.config.max_iterations,
            "iteration budget exhausted"
        );
        self.store
            .update_run_status(self.run_id, RunStatus::Timeout, Some("max iterations"))
            .await?;
        Ok(ExecutionResult::failed("max iterations"))
    }

    /// Dispatch one tool call: persist the step through its lifecycle,
    /// deduct credits, and append the output to the conversation. A failed
    /// tool fails the run without advancing the phase.
    async fn execute_tool(
        &mut self,
        conversation: &mut Conversation,
        tool_name: &str,
        tool_input: Value,
    ) -> Result<()> {
        self.step_count += 1;
        let mut step =
            StepRecord::pending(self.run_id, self.step_count, tool_name, tool_input.clone());
        self.store.insert_step(&step).await?;

        step.status = StepStatus::Running;
        self.store.update_step(&step).await?;

        let ctx = ToolContext {
            run_id: self.run_id,
            user_id: self.user_id.clone(),
            step_id: step.id,
        };

        let outcome = match self.tools.execute(tool_name, &tool_input, &ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = e.to_string();
                step.status = StepStatus::Failed;
                step.error_message = Some(reason.clone());
                self.store.update_step(&step).await?;
                self.activity.tool_error(self.run_id, tool_name, &reason).await;
                return Err(ForemanError::ActionExecution {
                    action: tool_name.to_string(),
                    reason,
                });
            }
        };

        if outcome.credits_used > 0.0 {
            self.ledger
                .deduct(&self.user_id, self.run_id, outcome.credits_used)
                .await?;
        }

        if outcome.success {
            step.status = StepStatus::Completed;
            step.tool_output = Some(outcome.output.clone());
            step.credits_used = outcome.credits_used;
            self.store.update_step(&step).await?;

            conversation.push(Message::tool_output(
                self.run_id,
                step.id,
                tool_name,
                outcome.output.to_string(),
            ));
            self.activity
                .tool_success(self.run_id, tool_name, outcome.credits_used)
                .await;
            Ok(())
        } else {
            let reason = outcome
                .error
                .unwrap_or_else(|| "tool reported failure".to_string());
            step.status = StepStatus::Failed;
            step.credits_used = outcome.credits_used;
            step.error_message = Some(reason.clone());
            self.store.update_step(&step).await?;
            self.activity.tool_error(self.run_id, tool_name, &reason).await;
            Err(ForemanError::ActionExecution {
                action: tool_name.to_string(),
                reason,
            })
        }
    }
}

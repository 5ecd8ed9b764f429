use regex::Regex;
use tracing::debug;

use crate::conversation::Conversation;
use foreman_config::schema::LlmConfig;
use foreman_core::{Action, ForemanError, Phase, Plan, Result};
use foreman_llm::{LlmRequest, ProviderRouter};

/// One decision produced by the engine, with the usage that produced it.
#[derive(Debug, Clone)]
pub struct Decision {
    pub action: Action,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Provider-reported cost of the call, USD.
    pub cost_usd: f64,
}

/// Builds the phase-scoped prompt, calls the model through the router,
/// and extracts a structured action from the response.
pub struct DecisionEngine {
    router: ProviderRouter,
    config: LlmConfig,
}

impl DecisionEngine {
    pub fn new(router: ProviderRouter, config: LlmConfig) -> Self {
        Self { router, config }
    }

    /// Ask the model what to do next for the current phase.
    ///
    /// An empty response or unparseable output is a `Decision` error; the
    /// caller fails the run rather than retrying.
    pub async fn decide(
        &self,
        plan: &Plan,
        phase: &Phase,
        conversation: &Conversation,
    ) -> Result<Decision> {
        let request = LlmRequest {
            model: self.config.model.clone(),
            messages: conversation.to_chat(),
            system: Some(build_system_prompt(plan, phase)),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let completion = self
            .router
            .complete(&request, self.config.fallback_model.as_deref())
            .await?;

        let content = completion
            .content
            .ok_or_else(|| ForemanError::Decision("model returned an empty response".into()))?;

        let action = extract_action(&content).ok_or_else(|| {
            debug!(response = %content, "no action found in model output");
            ForemanError::Decision("no parseable action in model output".into())
        })?;

        Ok(Decision {
            action,
            model: completion.model,
            input_tokens: completion.input_tokens,
            output_tokens: completion.output_tokens,
            cost_usd: completion.cost_usd,
        })
    }
}

/// System prompt for one decision cycle: the overall goal, the current
/// phase, and the action schema the model must answer with.
fn build_system_prompt(plan: &Plan, phase: &Phase) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an autonomous agent working through a multi-phase plan.\n\n");
    prompt.push_str(&format!("Overall goal: {}\n\n", plan.goal));
    prompt.push_str(&format!(
        "Current phase {} of {}: {}\n{}\n",
        phase.number,
        plan.last_phase_number(),
        phase.name,
        phase.description
    ));

    if !phase.expected_outputs.is_empty() {
        prompt.push_str("\nExpected outputs for this phase:\n");
        for output in &phase.expected_outputs {
            prompt.push_str(&format!("- {}\n", output));
        }
    }
    if !phase.required_capabilities.is_empty() {
        prompt.push_str("\nCapabilities available to you:\n");
        for cap in &phase.required_capabilities {
            prompt.push_str(&format!("- {}\n", cap));
        }
    }

    prompt.push_str(
        "\nDecide the single next action. Respond with exactly one JSON object, no other text:\n\
         {\"type\": \"tool\", \"tool_name\": \"...\", \"tool_input\": {...}, \"reasoning\": \"...\"}\n\
         {\"type\": \"message\", \"message\": \"...\", \"reasoning\": \"...\"}\n\
         {\"type\": \"phase_complete\", \"message\": \"...\", \"reasoning\": \"...\"}\n\
         {\"type\": \"task_complete\", \"message\": \"...\", \"reasoning\": \"...\"}\n\
         {\"type\": \"request_input\", \"message\": \"...\", \"reasoning\": \"...\"}\n\
         \n\
         Use \"tool\" to act, \"message\" to report progress, \"phase_complete\" when this \
         phase's outputs are done, \"task_complete\" when the overall goal is achieved, and \
         \"request_input\" when you cannot proceed without the user.",
    );

    prompt
}

/// Pull an `Action` out of free-text model output. First success wins:
/// whole response, ```json fence, any ``` fence, then the first `{...}`
/// span. Models inconsistently wrap structured output in prose.
pub fn extract_action(text: &str) -> Option<Action> {
    let trimmed = text.trim();

    if let Ok(action) = serde_json::from_str::<Action>(trimmed) {
        return Some(action);
    }

    let json_fence = Regex::new(r"(?s)```json\s*(.*?)```").ok()?;
    if let Some(caps) = json_fence.captures(trimmed)
        && let Ok(action) = serde_json::from_str::<Action>(caps[1].trim())
    {
        return Some(action);
    }

    let any_fence = Regex::new(r"(?s)```\s*(.*?)```").ok()?;
    if let Some(caps) = any_fence.captures(trimmed)
        && let Ok(action) = serde_json::from_str::<Action>(caps[1].trim())
    {
        return Some(action);
    }

    let brace_span = Regex::new(r"(?s)\{.*\}").ok()?;
    if let Some(m) = brace_span.find(trimmed)
        && let Ok(action) = serde_json::from_str::<Action>(m.as_str())
    {
        return Some(action);
    }

    None
}

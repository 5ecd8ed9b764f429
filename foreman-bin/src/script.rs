use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::Path;

use foreman_core::{ForemanError, Result, ToolContext, ToolOutcome, ToolRouter};
use foreman_llm::{Completion, LlmProvider, LlmRequest};

/// Replays model responses from a script file, one response per line.
///
/// Lets a plan be driven end to end without provider credentials: each
/// decision cycle consumes the next line as the model output. Costs are
/// derived from the configured per-Mtok rates over estimated tokens.
pub struct ScriptProvider {
    responses: Mutex<VecDeque<String>>,
    input_cost_per_mtok: f64,
    output_cost_per_mtok: f64,
}

impl ScriptProvider {
    pub fn from_file(
        path: &Path,
        input_cost_per_mtok: f64,
        output_cost_per_mtok: f64,
    ) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let responses: VecDeque<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(String::from)
            .collect();
        if responses.is_empty() {
            return Err(ForemanError::Configuration(format!(
                "script file {} has no responses",
                path.display()
            )));
        }
        Ok(Self {
            responses: Mutex::new(responses),
            input_cost_per_mtok,
            output_cost_per_mtok,
        })
    }

    pub fn len(&self) -> usize {
        self.responses.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.lock().is_empty()
    }
}

#[async_trait]
impl LlmProvider for ScriptProvider {
    fn name(&self) -> &str {
        "script"
    }

    fn models(&self) -> Vec<String> {
        vec!["script/replay".to_string()]
    }

    async fn complete(&self, request: &LlmRequest) -> Result<Completion> {
        let content = self.responses.lock().pop_front();
        let input_tokens: u32 = request
            .messages
            .iter()
            .map(|m| (m.content.len() / 4) as u32)
            .sum();
        let output_tokens = content.as_ref().map(|c| (c.len() / 4) as u32).unwrap_or(0);
        let cost_usd = input_tokens as f64 / 1_000_000.0 * self.input_cost_per_mtok
            + output_tokens as f64 / 1_000_000.0 * self.output_cost_per_mtok;
        Ok(Completion {
            content,
            model: request.model.clone(),
            input_tokens,
            output_tokens,
            cost_usd,
        })
    }
}

/// Echoes every tool call back as its own output. Stands in for real
/// tool integrations during scripted replays.
pub struct EchoTools;

#[async_trait]
impl ToolRouter for EchoTools {
    async fn execute(
        &self,
        tool_name: &str,
        tool_input: &serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolOutcome> {
        Ok(ToolOutcome::success(
            serde_json::json!({
                "tool": tool_name,
                "echo": tool_input,
            }),
            0.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_llm::ChatMessage;
    use std::io::Write as _;

    #[tokio::test]
    async fn replays_lines_in_order_then_runs_dry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\nfirst\n\nsecond").unwrap();

        let provider = ScriptProvider::from_file(file.path(), 3.0, 15.0).unwrap();
        assert_eq!(provider.len(), 2);

        let request = LlmRequest {
            model: "replay".into(),
            messages: vec![ChatMessage::user("go")],
            system: None,
            max_tokens: 2048,
            temperature: 0.7,
        };

        let first = provider.complete(&request).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("first"));
        assert!(first.cost_usd > 0.0);
        let second = provider.complete(&request).await.unwrap();
        assert_eq!(second.content.as_deref(), Some("second"));
        let dry = provider.complete(&request).await.unwrap();
        assert!(dry.content.is_none());
    }

    #[test]
    fn empty_script_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ScriptProvider::from_file(file.path(), 3.0, 15.0).is_err());
    }
}

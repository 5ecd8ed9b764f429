use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `foreman.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForemanConfig {
    pub supervisor: SupervisorConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

// ── Supervisor ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Maximum decision cycles per `execute()` call before forcing a timeout.
    pub max_iterations: u32,
    /// Context budget in estimated tokens. Conversations above this are
    /// trimmed to their trailing half before prompting.
    pub max_context_tokens: usize,
    /// Pause between decision cycles, in milliseconds.
    pub cycle_delay_ms: u64,
    /// Credits granted to a user the first time their balance is looked up.
    pub default_credit_grant: f64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            max_context_tokens: 100_000,
            cycle_delay_ms: 100,
            default_credit_grant: 10_000.0,
        }
    }
}

// ── LLM ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Primary model identifier in "provider/model" format.
    pub model: String,
    /// Fallback model for when the primary is unavailable.
    pub fallback_model: Option<String>,
    /// Maximum tokens per decision response.
    pub max_tokens: u32,
    /// Temperature (0.0 - 2.0).
    pub temperature: f32,
    /// Cost per 1M input tokens, USD.
    pub input_cost_per_mtok: f64,
    /// Cost per 1M output tokens, USD.
    pub output_cost_per_mtok: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-sonnet-4-20250514".into(),
            fallback_model: None,
            max_tokens: 2048,
            temperature: 0.7,
            input_cost_per_mtok: 3.0,
            output_cost_per_mtok: 15.0,
        }
    }
}

// ── Store ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("foreman.db"),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty", "json", "compact".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

// ── Default for root ───────────────────────────────────────────

impl Default for ForemanConfig {
    fn default() -> Self {
        Self {
            supervisor: SupervisorConfig::default(),
            llm: LlmConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, " ({})", h)?;
        }
        Ok(())
    }
}

impl ForemanConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        let model = &self.llm.model;
        if model.is_empty() {
            warnings.push(ConfigWarning {
                field: "llm.model".into(),
                message: "model is empty".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. 'anthropic/claude-sonnet-4-20250514'".into()),
            });
        } else if !model.contains('/') {
            warnings.push(ConfigWarning {
                field: "llm.model".into(),
                message: format!("model '{}' should be in 'provider/model' format", model),
                severity: WarningSeverity::Warning,
                hint: Some("use 'anthropic/claude-sonnet-4-20250514' or 'openai/gpt-4o'".into()),
            });
        }

        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            warnings.push(ConfigWarning {
                field: "llm.temperature".into(),
                message: format!("temperature {} is out of range", self.llm.temperature),
                severity: WarningSeverity::Error,
                hint: Some("temperature must be between 0.0 and 2.0".into()),
            });
        }

        if self.llm.max_tokens == 0 {
            warnings.push(ConfigWarning {
                field: "llm.max_tokens".into(),
                message: "max_tokens is 0, the model cannot produce output".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. 2048".into()),
            });
        }

        if self.supervisor.max_iterations == 0 {
            warnings.push(ConfigWarning {
                field: "supervisor.max_iterations".into(),
                message: "max_iterations is 0, every run would time out immediately".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to e.g. 50".into()),
            });
        }

        if self.supervisor.max_context_tokens < 1_000 {
            warnings.push(ConfigWarning {
                field: "supervisor.max_context_tokens".into(),
                message: format!(
                    "context budget {} is very small, the model will see almost no history",
                    self.supervisor.max_context_tokens
                ),
                severity: WarningSeverity::Warning,
                hint: Some("100000 is the usual budget".into()),
            });
        }

        if self.supervisor.default_credit_grant < 0.0 {
            warnings.push(ConfigWarning {
                field: "supervisor.default_credit_grant".into(),
                message: "credit grant is negative".into(),
                severity: WarningSeverity::Error,
                hint: Some("set to 0 or a positive amount".into()),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.level".into(),
                message: format!("unknown log level '{}'", self.logging.level),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_levels.join(", "))),
            });
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("valid values: {}", valid_formats.join(", "))),
            });
        }

        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("configuration errors:\n  {}", errors.join("\n  ")));
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ForemanConfig::default();
        let warnings = config.validate().unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.supervisor.max_iterations, 50);
        assert_eq!(config.supervisor.max_context_tokens, 100_000);
        assert_eq!(config.llm.max_tokens, 2048);
        assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_iterations_is_an_error() {
        let mut config = ForemanConfig::default();
        config.supervisor.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn bare_model_name_warns_without_failing() {
        let mut config = ForemanConfig::default();
        config.llm.model = "gpt-4o".into();
        let warnings = config.validate().unwrap();
        assert!(warnings.iter().any(|w| w.field == "llm.model"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ForemanConfig = toml::from_str(
            r#"
            [llm]
            model = "openai/gpt-4o"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "openai/gpt-4o");
        assert_eq!(config.llm.max_tokens, 2048);
        assert_eq!(config.supervisor.max_iterations, 50);
    }
}

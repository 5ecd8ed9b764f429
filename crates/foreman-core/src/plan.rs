use serde::{Deserialize, Serialize};

use crate::error::{ForemanError, Result};

/// An immutable description of a goal broken into ordered phases.
///
/// A `Plan` is created by an external caller before the run starts and is
/// never mutated for the lifetime of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub goal: String,
    pub phases: Vec<Phase>,
}

/// One ordered unit of work within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// 1-based position in the plan. Unique and strictly ascending.
    pub number: u32,
    pub name: String,
    pub description: String,
    /// Capabilities the executing agent needs for this phase, e.g.
    /// "shell", "browser", "code".
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// What the phase is expected to produce.
    #[serde(default)]
    pub expected_outputs: Vec<String>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self {
            goal: goal.into(),
            phases,
        }
    }

    /// Check structural invariants: at least one phase, numbers start at 1
    /// and ascend without gaps or duplicates.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(ForemanError::Configuration("plan has no phases".into()));
        }
        for (i, phase) in self.phases.iter().enumerate() {
            let expected = i as u32 + 1;
            if phase.number != expected {
                return Err(ForemanError::Configuration(format!(
                    "phase numbering broken: expected {expected}, found {}",
                    phase.number
                )));
            }
        }
        Ok(())
    }

    /// Look up a phase by its number.
    pub fn phase(&self, number: u32) -> Option<&Phase> {
        self.phases.iter().find(|p| p.number == number)
    }

    /// The highest phase number in the plan (0 for an empty plan).
    pub fn last_phase_number(&self) -> u32 {
        self.phases.iter().map(|p| p.number).max().unwrap_or(0)
    }
}

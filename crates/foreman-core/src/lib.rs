//! # foreman-core
//!
//! Core types, traits, and primitives for the Foreman run supervisor.
//! This crate defines the shared vocabulary used by every other crate in
//! the workspace.

pub mod action;
pub mod billing;
pub mod error;
pub mod event;
pub mod message;
pub mod plan;
pub mod run;
pub mod tool;

pub use action::Action;
pub use billing::{CreditBalance, TokenRecord};
pub use error::{ForemanError, Result};
pub use event::{RunEvent, RunEventBus, RunEventKind};
pub use message::{Message, Role};
pub use plan::{Phase, Plan};
pub use run::{ExecutionResult, ExecutionStatus, RunRecord, RunStatus, StepRecord, StepStatus};
pub use tool::{ToolContext, ToolOutcome, ToolRouter};

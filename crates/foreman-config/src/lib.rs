//! # foreman-config
//!
//! Configuration system for the Foreman supervisor. Reads from `foreman.toml`
//! and environment variables, in that precedence order.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::ForemanConfig;
pub use schema::{ConfigWarning, WarningSeverity};

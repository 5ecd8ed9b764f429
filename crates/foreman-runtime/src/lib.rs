//! # foreman-runtime
//!
//! The supervisor: a bounded decide/act/persist loop that drives one run
//! through a multi-phase plan until it completes, suspends, or fails.

pub mod activity;
pub mod conversation;
pub mod decision;
pub mod ledger;
pub mod supervisor;

pub use activity::ActivityLogger;
pub use conversation::Conversation;
pub use decision::{Decision, DecisionEngine};
pub use ledger::CreditLedger;
pub use supervisor::Supervisor;

//! # foreman-store
//!
//! Durable state for the supervisor: runs, steps, conversation messages,
//! activity logs, token usage, and credit balances, backed by SQLite.

pub mod client;
pub mod sqlite;

pub use client::PersistenceClient;
pub use sqlite::SqliteStore;

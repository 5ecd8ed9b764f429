use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Kind of a run activity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEventKind {
    Info,
    Success,
    Error,
    ToolSuccess,
    ToolError,
    PhaseAdvance,
}

impl RunEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunEventKind::Info => "info",
            RunEventKind::Success => "success",
            RunEventKind::Error => "error",
            RunEventKind::ToolSuccess => "tool_success",
            RunEventKind::ToolError => "tool_error",
            RunEventKind::PhaseAdvance => "phase_advance",
        }
    }
}

/// A structured activity event for one run, published on the run's
/// real-time channel and mirrored to durable storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub run_id: Uuid,
    pub kind: RunEventKind,
    pub message: String,
    /// Event-specific payload: tool name, credits, from/to phase, etc.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

impl RunEvent {
    pub fn new(run_id: Uuid, kind: RunEventKind, message: impl Into<String>) -> Self {
        Self {
            run_id,
            kind,
            message: message.into(),
            metadata: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-run broadcast channels for real-time event delivery.
///
/// One stream per run id. Delivery is lossy for slow subscribers; the
/// durable task log table is the source of truth.
#[derive(Clone)]
pub struct RunEventBus {
    capacity: usize,
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<RunEvent>>>>,
}

impl RunEventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn sender(&self, run_id: Uuid) -> broadcast::Sender<RunEvent> {
        let mut channels = self.channels.lock();
        channels
            .entry(run_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish an event on its run's channel. Send errors (no subscribers)
    /// are ignored.
    pub fn publish(&self, event: RunEvent) {
        let _ = self.sender(event.run_id).send(event);
    }

    /// Subscribe to one run's event stream.
    pub fn subscribe(&self, run_id: Uuid) -> broadcast::Receiver<RunEvent> {
        self.sender(run_id).subscribe()
    }

    /// Drop the channel for a finished run.
    pub fn remove(&self, run_id: Uuid) {
        self.channels.lock().remove(&run_id);
    }
}

impl Default for RunEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = RunEventBus::default();
        let run_id = Uuid::new_v4();
        let mut rx = bus.subscribe(run_id);

        bus.publish(RunEvent::new(run_id, RunEventKind::Info, "hello"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, RunEventKind::Info);
        assert_eq!(event.message, "hello");
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let bus = RunEventBus::default();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();
        let mut rx_b = bus.subscribe(run_b);

        bus.publish(RunEvent::new(run_a, RunEventKind::Info, "for a"));
        bus.publish(RunEvent::new(run_b, RunEventKind::Success, "for b"));

        let event = rx_b.recv().await.unwrap();
        assert_eq!(event.message, "for b");
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = RunEventBus::default();
        bus.publish(RunEvent::new(Uuid::new_v4(), RunEventKind::Error, "lost"));
    }
}

//! Event sink adapters.

use std::sync::Mutex;

use crate::domain::models::{EventEnvelope, EventSeverity};
use crate::domain::ports::EventSink;

/// Forwards engine events to the `tracing` subscriber at mapped levels.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, envelope: &EventEnvelope) {
        let kind = envelope.event.kind();
        let payload = serde_json::to_string(&envelope.event).unwrap_or_default();
        match envelope.severity {
            EventSeverity::Debug => tracing::debug!(kind, %payload, "handoff event"),
            EventSeverity::Info => tracing::info!(kind, %payload, "handoff event"),
            EventSeverity::Warning => tracing::warn!(kind, %payload, "handoff event"),
            EventSeverity::Error => tracing::error!(kind, %payload, "handoff event"),
        }
    }
}

/// Stores every event for later inspection. Intended for tests.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<EventEnvelope>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in emission order.
    pub fn events(&self) -> Vec<EventEnvelope> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Kinds of all recorded events, in emission order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events()
            .iter()
            .map(|envelope| envelope.event.kind())
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn record(&self, envelope: &EventEnvelope) {
        if let Ok(mut events) = self.events.lock() {
            events.push(envelope.clone());
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn record(&self, _envelope: &EventEnvelope) {}
}

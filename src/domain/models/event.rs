//! Structured observability events.
//!
//! Every stage of the engine emits one of these records through the event
//! pipeline. Payloads are a tagged union per event kind, not an open map,
//! so sinks stay type-safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One structured record per engine event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HandoffEvent {
    /// A handoff attempt entered the pipeline.
    HandoffStarted {
        handoff_id: String,
        trace_id: String,
        source_worker: String,
        target_worker: String,
        conversation_id: String,
    },
    /// A handoff attempt completed with control transferred.
    HandoffSucceeded {
        handoff_id: String,
        trace_id: String,
        target_worker: String,
        duration_ms: u64,
    },
    /// A handoff attempt terminated without transferring control.
    HandoffFailed {
        handoff_id: String,
        trace_id: String,
        stage: String,
        reason: String,
    },
    /// The validator finished a request.
    ValidationCompleted {
        trace_id: String,
        is_valid: bool,
        error_count: usize,
        warning_count: usize,
    },
    /// The fallback planner ran a recovery strategy.
    FallbackAttempted {
        handoff_id: String,
        strategy: String,
        substitute_worker: Option<String>,
        succeeded: bool,
    },
    /// The classifier produced a handoff suggestion.
    SuggestionProduced {
        conversation_id: String,
        target_worker: String,
        confidence: f64,
        tier: String,
    },
    /// A trace span opened.
    SpanStarted {
        trace_id: String,
        span_id: String,
        name: String,
    },
    /// A trace span closed.
    SpanEnded {
        trace_id: String,
        span_id: String,
        name: String,
        duration_ms: u64,
        error: Option<String>,
    },
    /// A cache keyspace was consulted.
    CacheLookup {
        keyspace: String,
        hit: bool,
    },
    /// A deferred job changed state or progress.
    JobStateChanged {
        job_id: String,
        state: String,
        progress: u8,
    },
    /// A parallel fan-out batch finished.
    ParallelBatchCompleted {
        conversation_id: String,
        dispatched: usize,
        failed: usize,
        duration_ms: u64,
    },
}

impl HandoffEvent {
    /// Default severity for this event kind.
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::HandoffFailed { .. } => EventSeverity::Error,
            Self::FallbackAttempted { succeeded: false, .. } => EventSeverity::Warning,
            Self::ValidationCompleted { is_valid: false, .. } => EventSeverity::Warning,
            Self::SpanStarted { .. } | Self::SpanEnded { .. } | Self::CacheLookup { .. } => {
                EventSeverity::Debug
            }
            _ => EventSeverity::Info,
        }
    }

    /// Short kind label for log lines and counters.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HandoffStarted { .. } => "handoff_started",
            Self::HandoffSucceeded { .. } => "handoff_succeeded",
            Self::HandoffFailed { .. } => "handoff_failed",
            Self::ValidationCompleted { .. } => "validation_completed",
            Self::FallbackAttempted { .. } => "fallback_attempted",
            Self::SuggestionProduced { .. } => "suggestion_produced",
            Self::SpanStarted { .. } => "span_started",
            Self::SpanEnded { .. } => "span_ended",
            Self::CacheLookup { .. } => "cache_lookup",
            Self::JobStateChanged { .. } => "job_state_changed",
            Self::ParallelBatchCompleted { .. } => "parallel_batch_completed",
        }
    }
}

/// Envelope pairing an event with its emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
    /// Severity at emission
    pub severity: EventSeverity,
    /// The event payload
    pub event: HandoffEvent,
}

impl EventEnvelope {
    pub fn new(event: HandoffEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            severity: event.severity(),
            event,
        }
    }
}

//! Span-based execution tracing and event distribution.
//!
//! Every engine stage reports through an [`EventPipeline`]: an ordered list
//! of pluggable sinks. The pipeline contains sink panics so a misbehaving
//! processor can never propagate back into the orchestrator.

use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::domain::models::{EventEnvelope, HandoffEvent};
use crate::domain::ports::{Clock, EventSink, IdGenerator};

/// Ordered chain of event sinks.
pub struct EventPipeline {
    sinks: Vec<Arc<dyn EventSink>>,
    clock: Arc<dyn Clock>,
}

impl EventPipeline {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>, clock: Arc<dyn Clock>) -> Self {
        Self { sinks, clock }
    }

    /// Pipeline with no sinks; events are dropped.
    pub fn disabled(clock: Arc<dyn Clock>) -> Self {
        Self::new(Vec::new(), clock)
    }

    /// Stamp and dispatch an event to every sink, in order. A sink that
    /// panics is skipped and reported through `tracing`; remaining sinks
    /// still run.
    pub fn emit(&self, event: HandoffEvent) {
        let envelope = EventEnvelope::new(event, self.clock.now());
        for sink in &self.sinks {
            let outcome = catch_unwind(AssertUnwindSafe(|| sink.record(&envelope)));
            if outcome.is_err() {
                tracing::warn!(kind = envelope.event.kind(), "event sink panicked");
            }
        }
    }

    /// Current time from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// An open span within a trace.
#[derive(Debug, Clone)]
pub struct SpanHandle {
    /// Trace this span belongs to
    pub trace_id: String,
    /// Span identifier
    pub span_id: String,
    /// Operation name
    pub name: String,
    started_at: DateTime<Utc>,
}

/// Creates traces and records their spans through the event pipeline.
pub struct TraceRecorder {
    pipeline: Arc<EventPipeline>,
    ids: Arc<dyn IdGenerator>,
}

impl TraceRecorder {
    pub fn new(pipeline: Arc<EventPipeline>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { pipeline, ids }
    }

    /// Begin a new trace.
    pub fn new_trace(&self) -> String {
        format!("trace-{}", self.ids.generate())
    }

    /// Open a named span inside a trace.
    pub fn start_span(&self, trace_id: &str, name: &str) -> SpanHandle {
        let span = SpanHandle {
            trace_id: trace_id.to_string(),
            span_id: format!("span-{}", self.ids.generate()),
            name: name.to_string(),
            started_at: self.pipeline.now(),
        };
        self.pipeline.emit(HandoffEvent::SpanStarted {
            trace_id: span.trace_id.clone(),
            span_id: span.span_id.clone(),
            name: span.name.clone(),
        });
        span
    }

    /// Close a span, recording its duration and outcome.
    pub fn end_span(&self, span: SpanHandle, error: Option<&str>) {
        let duration = self.pipeline.now() - span.started_at;
        self.pipeline.emit(HandoffEvent::SpanEnded {
            trace_id: span.trace_id,
            span_id: span.span_id,
            name: span.name,
            duration_ms: duration.num_milliseconds().max(0) as u64,
            error: error.map(ToString::to_string),
        });
    }
}

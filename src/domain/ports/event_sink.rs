//! Port for observability event processors.

use crate::domain::models::EventEnvelope;

/// One processor in the ordered event pipeline.
///
/// Sinks receive every engine event (handoff lifecycle, validation,
/// fallback attempts, suggestions, spans, cache lookups, job transitions).
/// The pipeline contains sink panics; implementations should still avoid
/// panicking and must not block.
pub trait EventSink: Send + Sync {
    /// Process one event.
    fn record(&self, envelope: &EventEnvelope);
}

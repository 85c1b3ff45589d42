//! Handoff domain model.
//!
//! A handoff transfers conversational control from one worker to another.
//! Requests are immutable values; retries and fallbacks wrap an existing
//! request into a new one rather than mutating it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status of a completed or deferred handoff attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    /// Control moved to the target worker
    Success,
    /// The attempt failed; the error field carries the reason
    Failed,
    /// The attempt was deferred and has not finished yet
    Pending,
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// A request to move conversational control between two workers.
///
/// Immutable once built. Use [`HandoffRequest::redirected`] to derive a new
/// request pointed at a substitute target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    /// Worker currently holding the conversation
    pub source_worker: String,
    /// Worker that should take over
    pub target_worker: String,
    /// Conversation this handoff belongs to
    pub conversation_id: String,
    /// Conversation context passed along with control
    pub context: HashMap<String, serde_json::Value>,
    /// Free-form request metadata
    pub metadata: HashMap<String, String>,
    /// Optional reason for the transfer
    pub reason: Option<String>,
    /// Ordering/escalation hint, >= 1
    pub priority: u32,
    /// Capabilities the target must advertise
    pub required_capabilities: Vec<String>,
    /// Worker to fall back to if the handoff fails
    pub fallback_worker: Option<String>,
}

impl HandoffRequest {
    /// Create a request with default priority and empty context.
    pub fn new(
        source_worker: impl Into<String>,
        target_worker: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            source_worker: source_worker.into(),
            target_worker: target_worker.into(),
            conversation_id: conversation_id.into(),
            context: HashMap::new(),
            metadata: HashMap::new(),
            reason: None,
            priority: 1,
            required_capabilities: Vec::new(),
            fallback_worker: None,
        }
    }

    /// Set the context map.
    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context = context;
        self
    }

    /// Insert a single context entry.
    pub fn with_context_entry(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Insert a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the priority hint. Clamped to a minimum of 1.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    /// Set the required capabilities.
    pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fallback worker.
    pub fn with_fallback_worker(mut self, worker: impl Into<String>) -> Self {
        self.fallback_worker = Some(worker.into());
        self
    }

    /// Derive a new request pointed at a substitute target. The original
    /// request is left untouched.
    pub fn redirected(&self, new_target: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.target_worker = new_target.into();
        next.fallback_worker = None;
        next
    }

    /// Structural validity of the request itself. Routing-level checks
    /// (permissions, cycles, ceilings) live in the validator.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_worker.is_empty() {
            return Err("source worker cannot be empty".to_string());
        }
        if self.target_worker.is_empty() {
            return Err("target worker cannot be empty".to_string());
        }
        if self.conversation_id.is_empty() {
            return Err("conversation id cannot be empty".to_string());
        }
        if self.priority < 1 {
            return Err(format!("priority must be >= 1, got {}", self.priority));
        }
        Ok(())
    }
}

/// Outcome of a handoff attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffResult {
    /// Identifier assigned to this attempt
    pub handoff_id: String,
    /// Final status
    pub status: HandoffStatus,
    /// Worker holding the conversation after the attempt
    pub target_worker: String,
    /// Failure reason, if any
    pub error: Option<String>,
    /// Context snapshot carried across the transfer
    pub context: HashMap<String, serde_json::Value>,
    /// Trace id for correlating events and spans
    pub trace_id: String,
}

impl HandoffResult {
    /// Successful transfer of control.
    pub fn success(
        handoff_id: impl Into<String>,
        target_worker: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            handoff_id: handoff_id.into(),
            status: HandoffStatus::Success,
            target_worker: target_worker.into(),
            error: None,
            context,
            trace_id: trace_id.into(),
        }
    }

    /// Failed attempt carrying a human-readable reason.
    pub fn failed(
        handoff_id: impl Into<String>,
        target_worker: impl Into<String>,
        error: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            handoff_id: handoff_id.into(),
            status: HandoffStatus::Failed,
            target_worker: target_worker.into(),
            error: Some(error.into()),
            context: HashMap::new(),
            trace_id: trace_id.into(),
        }
    }

    /// Deferred attempt awaiting completion.
    pub fn pending(
        handoff_id: impl Into<String>,
        target_worker: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            handoff_id: handoff_id.into(),
            status: HandoffStatus::Pending,
            target_worker: target_worker.into(),
            error: None,
            context: HashMap::new(),
            trace_id: trace_id.into(),
        }
    }

    /// Whether control actually moved.
    pub fn is_success(&self) -> bool {
        self.status == HandoffStatus::Success
    }
}

/// One admitted handoff in a conversation's append-only history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    /// Worker that gave up control
    pub source_worker: String,
    /// Worker that received control
    pub target_worker: String,
    /// When the handoff was admitted
    pub timestamp: DateTime<Utc>,
    /// Identifier of the handoff attempt
    pub handoff_id: String,
}

impl HandoffRecord {
    pub fn new(
        source_worker: impl Into<String>,
        target_worker: impl Into<String>,
        timestamp: DateTime<Utc>,
        handoff_id: impl Into<String>,
    ) -> Self {
        Self {
            source_worker: source_worker.into(),
            target_worker: target_worker.into(),
            timestamp,
            handoff_id: handoff_id.into(),
        }
    }
}

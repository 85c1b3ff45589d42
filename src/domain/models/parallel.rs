//! Parallel fan-out result types.

use serde::{Deserialize, Serialize};

/// How a single worker in a fan-out batch finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The worker produced a response
    Success,
    /// The worker call failed
    Failed,
    /// The worker exceeded its per-call time budget
    TimedOut,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Per-worker outcome inside a fan-out batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOutcome {
    /// Worker this outcome belongs to
    pub worker: String,
    /// How the call finished
    pub status: OutcomeStatus,
    /// Response text on success
    pub response: Option<String>,
    /// Error text on failure or timeout
    pub error: Option<String>,
    /// Wall-clock duration of the call in milliseconds
    pub duration_ms: u64,
    /// Whether the response was served from cache
    pub cache_hit: bool,
}

impl WorkerOutcome {
    /// Successful call.
    pub fn success(
        worker: impl Into<String>,
        response: impl Into<String>,
        duration_ms: u64,
        cache_hit: bool,
    ) -> Self {
        Self {
            worker: worker.into(),
            status: OutcomeStatus::Success,
            response: Some(response.into()),
            error: None,
            duration_ms,
            cache_hit,
        }
    }

    /// Failed call.
    pub fn failed(worker: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            worker: worker.into(),
            status: OutcomeStatus::Failed,
            response: None,
            error: Some(error.into()),
            duration_ms,
            cache_hit: false,
        }
    }

    /// Call that exceeded its time budget.
    pub fn timed_out(worker: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            worker: worker.into(),
            status: OutcomeStatus::TimedOut,
            response: None,
            error: Some("worker call timed out".to_string()),
            duration_ms,
            cache_hit: false,
        }
    }

    /// Whether the call produced a usable response.
    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

/// Overall disposition of a fan-out batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Every worker succeeded
    AllSucceeded,
    /// At least one worker succeeded
    PartialSuccess,
    /// No worker produced a response
    AllFailed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllSucceeded => "all_succeeded",
            Self::PartialSuccess => "partial_success",
            Self::AllFailed => "all_failed",
        }
    }

    /// Derive the batch status from its outcomes.
    pub fn from_outcomes(outcomes: &[WorkerOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded == 0 {
            Self::AllFailed
        } else if succeeded == outcomes.len() {
            Self::AllSucceeded
        } else {
            Self::PartialSuccess
        }
    }
}

/// Result of fanning one request out to several workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelHandoffResult {
    /// One outcome per dispatched request, keyed by worker id
    pub outcomes: Vec<WorkerOutcome>,
    /// Overall batch disposition
    pub status: BatchStatus,
    /// Wall-clock duration of the whole batch in milliseconds
    pub total_duration_ms: u64,
    /// Combined response text, if any worker succeeded
    pub merged_response: Option<String>,
}

impl ParallelHandoffResult {
    /// Outcome for a specific worker, if it was part of the batch.
    pub fn outcome_for(&self, worker: &str) -> Option<&WorkerOutcome> {
        self.outcomes.iter().find(|o| o.worker == worker)
    }

    /// Number of successful outcomes.
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

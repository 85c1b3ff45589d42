//! Deferred handoff job model.
//!
//! A submitted handoff becomes a job that advances through a fixed sequence
//! of named steps. Job state follows an explicit transition table; progress
//! is a percentage derived from the last completed step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::handoff::{HandoffRequest, HandoffResult};

/// State of a deferred handoff job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, not yet picked up
    Pending,
    /// A worker task is advancing the step sequence
    Processing,
    /// All steps finished
    Completed,
    /// A step failed after exhausting retries
    Failed,
    /// Cancelled before completion
    Cancelled,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Valid transitions from this state.
    pub fn valid_transitions(&self) -> Vec<JobState> {
        match self {
            Self::Pending => vec![Self::Processing, Self::Cancelled],
            Self::Processing => vec![Self::Completed, Self::Failed, Self::Cancelled],
            Self::Completed | Self::Failed | Self::Cancelled => vec![],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Named processing steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStep {
    Validate,
    CheckPermissions,
    PrepareContext,
    Execute,
    Finalize,
}

impl JobStep {
    /// All steps in execution order.
    pub const SEQUENCE: [JobStep; 5] = [
        Self::Validate,
        Self::CheckPermissions,
        Self::PrepareContext,
        Self::Execute,
        Self::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::CheckPermissions => "check-permissions",
            Self::PrepareContext => "prepare-context",
            Self::Execute => "execute",
            Self::Finalize => "finalize",
        }
    }

    /// Progress percentage once this step has completed.
    pub fn progress_after(&self) -> u8 {
        match self {
            Self::Validate => 20,
            Self::CheckPermissions => 40,
            Self::PrepareContext => 60,
            Self::Execute => 85,
            Self::Finalize => 100,
        }
    }
}

/// Options accepted at job submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Override the configured attempt ceiling for this job
    pub max_attempts: Option<u32>,
}

impl JobOptions {
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Internal bookkeeping for one submitted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Job identifier returned at submission
    pub id: String,
    /// The handoff this job will perform
    pub request: HandoffRequest,
    /// Current state
    pub state: JobState,
    /// Progress percentage, 0-100
    pub progress: u8,
    /// Step currently executing or last completed
    pub current_step: Option<JobStep>,
    /// Final handoff result when completed
    pub result: Option<HandoffResult>,
    /// Failure text when failed
    pub error: Option<String>,
    /// Attempts made so far
    pub attempts: u32,
    /// Attempt ceiling
    pub max_attempts: u32,
    /// Cancellation flag, honored between steps
    pub cancel_requested: bool,
    /// Submission time, used for retention expiry
    pub created_at: DateTime<Utc>,
    /// Last state/progress change
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a pending record for a newly submitted request.
    pub fn new(
        id: impl Into<String>,
        request: HandoffRequest,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            request,
            state: JobState::Pending,
            progress: 0,
            current_step: None,
            result: None,
            error: None,
            attempts: 0,
            max_attempts,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the retention window has elapsed since creation.
    pub fn is_expired(&self, now: DateTime<Utc>, retention_secs: u64) -> bool {
        let age = now - self.created_at;
        age.num_seconds() >= 0 && age.num_seconds() as u64 >= retention_secs
    }

    /// Snapshot for status polling.
    pub fn status(&self) -> JobStatus {
        JobStatus {
            job_id: self.id.clone(),
            state: self.state,
            progress: self.progress,
            current_step: self.current_step,
            result: self.result.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Non-blocking status snapshot of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    /// Job identifier
    pub job_id: String,
    /// Current state
    pub state: JobState,
    /// Progress percentage, 0-100
    pub progress: u8,
    /// Step currently executing or last completed
    pub current_step: Option<JobStep>,
    /// Final handoff result when completed
    pub result: Option<HandoffResult>,
    /// Failure text when failed
    pub error: Option<String>,
    /// Last change timestamp
    pub updated_at: DateTime<Utc>,
}

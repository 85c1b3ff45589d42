//! Error types for handoff execution.
//!
//! Validation failures are never expressed here: they travel as
//! [`crate::domain::models::ValidationResult`] data. These errors cover
//! execution-time failures, which the orchestrator catches and routes to the
//! fallback planner instead of surfacing to callers.

use thiserror::Error;

/// Coarse error category consumed by the fallback planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Permission denied
    Security,
    /// Target lacks a required capability
    Capability,
    /// Time budget exceeded
    Timeout,
    /// A worker's chat call failed
    Provider,
    /// Anything else
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::Capability => "capability",
            Self::Timeout => "timeout",
            Self::Provider => "provider",
            Self::Other => "other",
        }
    }
}

/// Execution-time failures of a handoff attempt.
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("permission denied: {source_worker} may not hand off to {target_worker}")]
    Security {
        source_worker: String,
        target_worker: String,
    },

    #[error("worker {worker} lacks required capability {capability}")]
    Capability { worker: String, capability: String },

    #[error("handoff exceeded its time budget of {budget_secs}s")]
    Timeout { budget_secs: u64 },

    #[error("worker {worker} chat call failed: {message}")]
    Provider { worker: String, message: String },

    #[error("worker not registered: {0}")]
    WorkerNotFound(String),

    #[error("conversation store failure: {0}")]
    Store(String),
}

impl HandoffError {
    /// Category used for fallback strategy selection.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Security { .. } => ErrorCategory::Security,
            Self::Capability { .. } => ErrorCategory::Capability,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::WorkerNotFound(_) | Self::Store(_) => ErrorCategory::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        let security = HandoffError::Security {
            source_worker: "a".into(),
            target_worker: "b".into(),
        };
        assert_eq!(security.category(), ErrorCategory::Security);

        let capability = HandoffError::Capability {
            worker: "b".into(),
            capability: "mathematics".into(),
        };
        assert_eq!(capability.category(), ErrorCategory::Capability);

        assert_eq!(
            HandoffError::Timeout { budget_secs: 30 }.category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            HandoffError::Provider {
                worker: "b".into(),
                message: "rate limited".into()
            }
            .category(),
            ErrorCategory::Provider
        );
        assert_eq!(
            HandoffError::WorkerNotFound("x".into()).category(),
            ErrorCategory::Other
        );
    }

    #[test]
    fn test_display_messages() {
        let err = HandoffError::Security {
            source_worker: "triage".into(),
            target_worker: "vault".into(),
        };
        assert_eq!(
            err.to_string(),
            "permission denied: triage may not hand off to vault"
        );

        let timeout = HandoffError::Timeout { budget_secs: 30 };
        assert!(timeout.to_string().contains("30s"));
    }
}

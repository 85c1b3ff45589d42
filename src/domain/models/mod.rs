//! Domain models for the handoff engine.

pub mod config;
pub mod event;
pub mod handoff;
pub mod job;
pub mod parallel;
pub mod suggestion;
pub mod validation;
pub mod worker;

pub use config::{
    CacheConfig, Config, FallbackConfig, FallbackKind, JobConfig, LimitsConfig, LoggingConfig,
    PermissionsConfig, RoutingConfig, TimeoutConfig,
};
pub use event::{EventEnvelope, EventSeverity, HandoffEvent};
pub use handoff::{HandoffRecord, HandoffRequest, HandoffResult, HandoffStatus};
pub use job::{JobOptions, JobRecord, JobState, JobStatus, JobStep};
pub use parallel::{BatchStatus, OutcomeStatus, ParallelHandoffResult, WorkerOutcome};
pub use suggestion::{DomainMatch, HandoffSuggestion, SuggestionTier};
pub use validation::ValidationResult;
pub use worker::WorkerProfile;

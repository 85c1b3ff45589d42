//! Switchboard - Conversation Handoff Orchestrator
//!
//! Switchboard routes a single logical conversation across a pool of
//! capability-tagged workers, deciding at each turn whether the current
//! worker keeps the turn or control hands off to a better-suited one.
//! The engine covers capability-based lookup, heuristic intent
//! classification, handoff validation, fallback recovery, concurrent
//! fan-out with response merging, reversible handoffs, request-level
//! caching, deferred execution with status tracking, and span-based
//! observability.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture
//! principles:
//!
//! - **Domain Layer** (`domain`): models, error types, and port traits
//! - **Service Layer** (`services`): the engine components and the
//!   orchestrator that composes them
//! - **Adapters** (`adapters`): in-memory implementations of the ports
//! - **Infrastructure** (`infrastructure`): configuration loading and
//!   logging setup
//!
//! # Example
//!
//! ```ignore
//! use switchboard::services::HandoffOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Register workers, build an orchestrator, hand off turns.
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::error::{ErrorCategory, HandoffError};
pub use domain::models::{
    Config, HandoffRecord, HandoffRequest, HandoffResult, HandoffStatus, HandoffSuggestion,
    JobOptions, JobState, JobStatus, ParallelHandoffResult, ValidationResult, WorkerProfile,
};
pub use domain::ports::{
    CacheBackend, ChatWorker, Clock, ConversationStore, EventSink, IdGenerator, IntentStrategy,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    AsyncHandoffManager, CacheManager, EventPipeline, FallbackPlanner, HandoffOrchestrator,
    HandoffValidator, KeywordClassifier, ParallelHandoffManager, ReversibleHandoffManager,
    TraceRecorder, WorkerRegistry,
};

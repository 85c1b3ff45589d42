//! Engine services: the components the orchestrator composes.

pub mod async_manager;
pub mod cache_manager;
pub mod classifier;
pub mod fallback;
pub mod orchestrator;
pub mod parallel;
pub mod registry;
pub mod reversible;
pub mod trace;
pub mod validator;

pub use async_manager::AsyncHandoffManager;
pub use cache_manager::{CacheKind, CacheManager};
pub use classifier::{ConceptPattern, DomainDetector, KeywordClassifier};
pub use fallback::FallbackPlanner;
pub use orchestrator::{AttemptStage, HandoffOrchestrator};
pub use parallel::ParallelHandoffManager;
pub use registry::WorkerRegistry;
pub use reversible::ReversibleHandoffManager;
pub use trace::{EventPipeline, SpanHandle, TraceRecorder};
pub use validator::HandoffValidator;

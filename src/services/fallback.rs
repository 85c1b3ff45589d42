//! Fallback recovery for failed handoffs.
//!
//! Strategy selection order: the request's explicit fallback worker, then
//! the per-target override table, then the error-category map. Recovery
//! always produces a `HandoffResult`; substitute strategies report success
//! at the replacement worker, return-to-source reports failure with the
//! original error text.

use std::sync::Arc;

use crate::domain::error::{ErrorCategory, HandoffError};
use crate::domain::models::{FallbackConfig, FallbackKind, HandoffEvent, HandoffRequest, HandoffResult};
use crate::domain::ports::IdGenerator;
use crate::services::registry::WorkerRegistry;
use crate::services::trace::EventPipeline;

/// Strategy label for an explicit per-request fallback worker.
const EXPLICIT_STRATEGY: &str = "explicit_fallback";

/// Selects and executes a recovery strategy after a failed handoff.
pub struct FallbackPlanner {
    registry: Arc<WorkerRegistry>,
    config: FallbackConfig,
    generic_worker: String,
    pipeline: Arc<EventPipeline>,
    ids: Arc<dyn IdGenerator>,
}

impl FallbackPlanner {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        config: FallbackConfig,
        generic_worker: impl Into<String>,
        pipeline: Arc<EventPipeline>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            registry,
            config,
            generic_worker: generic_worker.into(),
            pipeline,
            ids,
        }
    }

    /// Recover from a failed handoff. Every attempt is recorded through the
    /// event pipeline regardless of outcome.
    pub fn recover(
        &self,
        request: &HandoffRequest,
        error: &HandoffError,
        trace_id: &str,
    ) -> HandoffResult {
        let handoff_id = format!("handoff-{}", self.ids.generate());

        // An explicit fallback worker on the request wins when it resolves.
        if let Some(fallback) = &request.fallback_worker {
            if self.registry.contains(fallback) {
                let result = HandoffResult::success(
                    &handoff_id,
                    fallback,
                    request.context.clone(),
                    trace_id,
                );
                self.record_attempt(&handoff_id, EXPLICIT_STRATEGY, Some(fallback), true);
                return result;
            }
        }

        let strategy = self
            .config
            .overrides
            .get(&request.target_worker)
            .copied()
            .unwrap_or_else(|| match error.category() {
                ErrorCategory::Security => FallbackKind::ReturnToSource,
                ErrorCategory::Capability => FallbackKind::RetryWithDifferentWorker,
                ErrorCategory::Timeout => FallbackKind::DegradeToGeneral,
                ErrorCategory::Provider | ErrorCategory::Other => self.config.default_strategy,
            });

        self.execute(strategy, &handoff_id, request, error, trace_id)
    }

    fn execute(
        &self,
        strategy: FallbackKind,
        handoff_id: &str,
        request: &HandoffRequest,
        error: &HandoffError,
        trace_id: &str,
    ) -> HandoffResult {
        match strategy {
            FallbackKind::RetryWithDifferentWorker => {
                let substitute = self
                    .registry
                    .find_by_capabilities(&request.required_capabilities)
                    .into_iter()
                    .map(|profile| profile.id.clone())
                    .find(|id| *id != request.target_worker);

                match substitute {
                    Some(worker) => {
                        let result = HandoffResult::success(
                            handoff_id,
                            &worker,
                            request.context.clone(),
                            trace_id,
                        );
                        self.record_attempt(handoff_id, strategy.as_str(), Some(&worker), true);
                        result
                    }
                    // No capability-matched replacement; degrade instead.
                    None => self.execute(
                        FallbackKind::DegradeToGeneral,
                        handoff_id,
                        request,
                        error,
                        trace_id,
                    ),
                }
            }
            FallbackKind::DegradeToGeneral => {
                if self.registry.contains(&self.generic_worker) {
                    let result = HandoffResult::success(
                        handoff_id,
                        &self.generic_worker,
                        request.context.clone(),
                        trace_id,
                    );
                    self.record_attempt(
                        handoff_id,
                        strategy.as_str(),
                        Some(&self.generic_worker),
                        true,
                    );
                    result
                } else {
                    let result = HandoffResult::failed(
                        handoff_id,
                        &request.target_worker,
                        error.to_string(),
                        trace_id,
                    );
                    self.record_attempt(handoff_id, strategy.as_str(), None, false);
                    result
                }
            }
            FallbackKind::ReturnToSource => {
                let result = HandoffResult::failed(
                    handoff_id,
                    &request.source_worker,
                    error.to_string(),
                    trace_id,
                );
                self.record_attempt(handoff_id, strategy.as_str(), None, false);
                result
            }
        }
    }

    fn record_attempt(
        &self,
        handoff_id: &str,
        strategy: &str,
        substitute: Option<&str>,
        succeeded: bool,
    ) {
        self.pipeline.emit(HandoffEvent::FallbackAttempted {
            handoff_id: handoff_id.to_string(),
            strategy: strategy.to_string(),
            substitute_worker: substitute.map(ToString::to_string),
            succeeded,
        });
    }
}

//! Handoff orchestration.
//!
//! Each attempt walks a fixed state machine: validate, check permissions,
//! resolve the target, persist state, record metrics. Terminal branches
//! before state is saved return a failed result carrying the reason and a
//! trace id; execution-time errors are routed to the fallback planner, so
//! callers never see a raw error from a normal attempt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::timeout;

use crate::domain::error::HandoffError;
use crate::domain::models::{
    Config, HandoffEvent, HandoffRecord, HandoffRequest, HandoffResult, HandoffSuggestion,
    ValidationResult,
};
use crate::domain::ports::{Clock, ConversationStore, IdGenerator, IntentStrategy};
use crate::services::cache_manager::CacheManager;
use crate::services::fallback::FallbackPlanner;
use crate::services::registry::WorkerRegistry;
use crate::services::trace::{EventPipeline, TraceRecorder};
use crate::services::validator::HandoffValidator;

/// Stages of the per-attempt state machine, used in failure events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStage {
    Created,
    Validated,
    PermissionChecked,
    TargetResolved,
    StateSaved,
    MetricsRecorded,
}

impl AttemptStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Validated => "validated",
            Self::PermissionChecked => "permission_checked",
            Self::TargetResolved => "target_resolved",
            Self::StateSaved => "state_saved",
            Self::MetricsRecorded => "metrics_recorded",
        }
    }
}

/// Keyed async locks serializing attempts within one conversation.
#[derive(Default)]
struct ConversationLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    fn for_conversation(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(conversation_id.to_string())
                .or_default(),
        )
    }
}

/// Coordinates validation, permissions, registry lookup, state persistence,
/// and fallback recovery for handoff attempts.
pub struct HandoffOrchestrator {
    registry: Arc<WorkerRegistry>,
    classifier: Arc<dyn IntentStrategy>,
    store: Arc<dyn ConversationStore>,
    cache: Arc<CacheManager>,
    validator: HandoffValidator,
    fallback: FallbackPlanner,
    pipeline: Arc<EventPipeline>,
    tracer: TraceRecorder,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: Config,
    conversation_locks: ConversationLocks,
}

impl HandoffOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<WorkerRegistry>,
        classifier: Arc<dyn IntentStrategy>,
        store: Arc<dyn ConversationStore>,
        cache: Arc<CacheManager>,
        pipeline: Arc<EventPipeline>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let validator =
            HandoffValidator::new(config.permissions.clone(), config.limits.clone());
        let fallback = FallbackPlanner::new(
            Arc::clone(&registry),
            config.fallback.clone(),
            config.routing.generic_worker.clone(),
            Arc::clone(&pipeline),
            Arc::clone(&ids),
        );
        let tracer = TraceRecorder::new(Arc::clone(&pipeline), Arc::clone(&ids));

        Self {
            registry,
            classifier,
            store,
            cache,
            validator,
            fallback,
            pipeline,
            tracer,
            ids,
            clock,
            config,
            conversation_locks: ConversationLocks::default(),
        }
    }

    /// The worker registry this orchestrator routes over.
    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute a handoff attempt end to end. Always returns a result:
    /// validation rejections and unresolved targets produce failed results,
    /// execution errors are recovered through the fallback planner, and the
    /// whole attempt runs under the configured time budget.
    pub async fn handle(&self, request: HandoffRequest) -> HandoffResult {
        let trace_id = self.tracer.new_trace();
        let handoff_id = format!("handoff-{}", self.ids.generate());
        let started = self.clock.now();

        self.pipeline.emit(HandoffEvent::HandoffStarted {
            handoff_id: handoff_id.clone(),
            trace_id: trace_id.clone(),
            source_worker: request.source_worker.clone(),
            target_worker: request.target_worker.clone(),
            conversation_id: request.conversation_id.clone(),
        });

        let budget = Duration::from_secs(self.config.timeouts.handoff_secs);
        let attempt = self.try_handle(&request, &handoff_id, &trace_id);

        let outcome = match timeout(budget, attempt).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => Err(HandoffError::Timeout {
                budget_secs: self.config.timeouts.handoff_secs,
            }),
        };

        match outcome {
            Ok(result) => {
                if result.is_success() {
                    let duration = self.clock.now() - started;
                    self.pipeline.emit(HandoffEvent::HandoffSucceeded {
                        handoff_id: handoff_id.clone(),
                        trace_id: trace_id.clone(),
                        target_worker: result.target_worker.clone(),
                        duration_ms: duration.num_milliseconds().max(0) as u64,
                    });
                }
                result
            }
            Err(error) => {
                let stage = match &error {
                    HandoffError::Security { .. } => AttemptStage::PermissionChecked,
                    HandoffError::Store(_) => AttemptStage::StateSaved,
                    _ => AttemptStage::Created,
                };
                self.pipeline.emit(HandoffEvent::HandoffFailed {
                    handoff_id: handoff_id.clone(),
                    trace_id: trace_id.clone(),
                    stage: stage.as_str().to_string(),
                    reason: error.to_string(),
                });
                self.fallback.recover(&request, &error, &trace_id)
            }
        }
    }

    async fn try_handle(
        &self,
        request: &HandoffRequest,
        handoff_id: &str,
        trace_id: &str,
    ) -> Result<HandoffResult, HandoffError> {
        // Attempts against the same conversation serialize so the cycle
        // scan and the handoff ceiling observe a consistent history.
        let lock = self
            .conversation_locks
            .for_conversation(&request.conversation_id);
        let _guard = lock.lock().await;

        // Validated
        let span = self.tracer.start_span(trace_id, "validate");
        let verdict = self.validate_locked(request).await?;
        self.pipeline.emit(HandoffEvent::ValidationCompleted {
            trace_id: trace_id.to_string(),
            is_valid: verdict.is_valid(),
            error_count: verdict.errors.len(),
            warning_count: verdict.warnings.len(),
        });
        if !verdict.is_valid() {
            let reason = verdict.error_summary();
            self.tracer.end_span(span, Some(&reason));
            return Ok(self.rejected(
                handoff_id,
                trace_id,
                AttemptStage::Validated,
                request,
                reason,
            ));
        }
        self.tracer.end_span(span, None);

        // PermissionChecked
        let span = self.tracer.start_span(trace_id, "check-permissions");
        if !self
            .config
            .permissions
            .allows(&request.source_worker, &request.target_worker)
        {
            let error = HandoffError::Security {
                source_worker: request.source_worker.clone(),
                target_worker: request.target_worker.clone(),
            };
            self.tracer.end_span(span, Some(&error.to_string()));
            return Err(error);
        }
        self.tracer.end_span(span, None);

        // TargetResolved
        let span = self.tracer.start_span(trace_id, "resolve-target");
        if !self.registry.contains(&request.target_worker) {
            let reason = format!("target worker {} is not registered", request.target_worker);
            self.tracer.end_span(span, Some(&reason));
            return Ok(self.rejected(
                handoff_id,
                trace_id,
                AttemptStage::TargetResolved,
                request,
                reason,
            ));
        }
        self.tracer.end_span(span, None);

        // StateSaved
        let span = self.tracer.start_span(trace_id, "save-state");
        let saved = self.persist_state(request, handoff_id).await;
        if let Err(error) = saved {
            self.tracer.end_span(span, Some(&error.to_string()));
            return Err(error);
        }
        self.tracer.end_span(span, None);

        // MetricsRecorded happens in `handle` once the result is final.
        Ok(HandoffResult::success(
            handoff_id,
            &request.target_worker,
            request.context.clone(),
            trace_id,
        ))
    }

    async fn persist_state(
        &self,
        request: &HandoffRequest,
        handoff_id: &str,
    ) -> Result<(), HandoffError> {
        let record = HandoffRecord::new(
            &request.source_worker,
            &request.target_worker,
            self.clock.now(),
            handoff_id,
        );
        self.store
            .append_handoff(&request.conversation_id, record)
            .await
            .map_err(|e| HandoffError::Store(e.to_string()))?;

        if !request.context.is_empty() {
            let merged = self
                .merged_context(&request.conversation_id, &request.context)
                .await?;
            self.store
                .save_context(&request.conversation_id, &merged)
                .await
                .map_err(|e| HandoffError::Store(e.to_string()))?;
        }
        Ok(())
    }

    fn rejected(
        &self,
        handoff_id: &str,
        trace_id: &str,
        stage: AttemptStage,
        request: &HandoffRequest,
        reason: String,
    ) -> HandoffResult {
        self.pipeline.emit(HandoffEvent::HandoffFailed {
            handoff_id: handoff_id.to_string(),
            trace_id: trace_id.to_string(),
            stage: stage.as_str().to_string(),
            reason: reason.clone(),
        });
        HandoffResult::failed(handoff_id, &request.target_worker, reason, trace_id)
    }

    /// Validate a request against current registry state and conversation
    /// history. Verdicts are cached; the cache key changes whenever the
    /// conversation history grows, so stale verdicts cannot be served.
    pub async fn validate_request(&self, request: &HandoffRequest) -> ValidationResult {
        let lock = self
            .conversation_locks
            .for_conversation(&request.conversation_id);
        let _guard = lock.lock().await;
        match self.validate_locked(request).await {
            Ok(verdict) => verdict,
            Err(error) => {
                let mut verdict = ValidationResult::ok();
                verdict.add_error(error.to_string());
                verdict
            }
        }
    }

    async fn validate_locked(
        &self,
        request: &HandoffRequest,
    ) -> Result<ValidationResult, HandoffError> {
        let history = self
            .store
            .history(&request.conversation_id)
            .await
            .map_err(|e| HandoffError::Store(e.to_string()))?;

        let fingerprint = serde_json::to_string(request).unwrap_or_default();
        let discriminator = format!("{}:{}", request.conversation_id, history.len());

        if let Some(cached) = self.cache.get_validation(&fingerprint, &discriminator).await {
            return Ok(cached);
        }

        let verdict = self.validator.validate(request, &self.registry, &history);
        self.cache
            .put_validation(&fingerprint, &discriminator, &verdict)
            .await;
        Ok(verdict)
    }

    /// Whether the permission graph allows a handoff edge.
    pub fn permission_allows(&self, source: &str, target: &str) -> bool {
        self.config.permissions.allows(source, target)
    }

    /// Stored conversation context with the request's context merged over it.
    pub async fn merged_context(
        &self,
        conversation_id: &str,
        request_context: &HashMap<String, serde_json::Value>,
    ) -> Result<HashMap<String, serde_json::Value>, HandoffError> {
        let mut merged = self
            .store
            .load_context(conversation_id)
            .await
            .map_err(|e| HandoffError::Store(e.to_string()))?;
        merged.extend(
            request_context
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        Ok(merged)
    }

    /// Classifier suggestion for the input, served cache-first. The bypass
    /// policy is honored before the cache is consulted.
    pub async fn suggest_handoff(
        &self,
        text: &str,
        current_worker: &str,
    ) -> Option<HandoffSuggestion> {
        let bypass = self.cache.should_bypass(text, &HashMap::new());
        if !bypass {
            if let Some(cached) = self.cache.get_suggestion(text, current_worker).await {
                return Some(cached);
            }
        }

        let suggestion = self.classifier.suggest(text, current_worker).await?;
        self.pipeline.emit(HandoffEvent::SuggestionProduced {
            conversation_id: String::new(),
            target_worker: suggestion.target_worker.clone(),
            confidence: suggestion.confidence,
            tier: suggestion.tier.as_str().to_string(),
        });
        if !bypass {
            self.cache
                .put_suggestion(text, current_worker, &suggestion)
                .await;
        }
        Some(suggestion)
    }

    /// Suggest and, when the suggestion clears the confidence threshold,
    /// execute the handoff. `None` when there is no suggestion or it is
    /// below the threshold (the caller keeps the conversation where it is).
    pub async fn handle_intelligent_handoff(
        &self,
        text: &str,
        current_worker: &str,
        conversation_id: &str,
        threshold: Option<f64>,
    ) -> Option<HandoffResult> {
        let threshold = threshold.unwrap_or(self.config.routing.confidence_threshold);
        let suggestion = self.suggest_handoff(text, current_worker).await?;
        if suggestion.confidence < threshold {
            return None;
        }

        let request = suggestion.into_request(current_worker, conversation_id);
        Some(self.handle(request).await)
    }

    /// Try the intelligent path; `None` when it produced nothing or failed.
    /// Manual routing is the caller's decision, never taken here.
    pub async fn handle_hybrid_handoff(
        &self,
        text: &str,
        current_worker: &str,
        conversation_id: &str,
    ) -> Option<HandoffResult> {
        let result = self
            .handle_intelligent_handoff(text, current_worker, conversation_id, None)
            .await?;
        result.is_success().then_some(result)
    }
}

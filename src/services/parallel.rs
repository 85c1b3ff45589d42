//! Multi-domain fan-out.
//!
//! Detects requests that span several domains, dispatches one synthetic
//! handoff per (domain, worker) pair concurrently, and merges the responses
//! into a single text. A slow or failing worker contributes a failed
//! outcome; it never aborts or blocks the rest of the batch.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, Instant};

use crate::domain::models::{
    BatchStatus, HandoffEvent, HandoffRequest, ParallelHandoffResult, WorkerOutcome,
};
use crate::services::cache_manager::CacheManager;
use crate::services::classifier::KeywordClassifier;
use crate::services::registry::WorkerRegistry;
use crate::services::trace::EventPipeline;

/// Context key carrying the original user text through synthetic requests.
pub const QUERY_CONTEXT_KEY: &str = "query";

/// Fixed reply when no worker produced a response.
const EMPTY_MERGE_MESSAGE: &str =
    "Your request could not be processed; no worker produced a response.";

/// Fans multi-domain requests out to several workers and merges the
/// responses.
pub struct ParallelHandoffManager {
    classifier: Arc<KeywordClassifier>,
    registry: Arc<WorkerRegistry>,
    cache: Arc<CacheManager>,
    pipeline: Arc<EventPipeline>,
    worker_call_timeout: Duration,
}

impl ParallelHandoffManager {
    pub fn new(
        classifier: Arc<KeywordClassifier>,
        registry: Arc<WorkerRegistry>,
        cache: Arc<CacheManager>,
        pipeline: Arc<EventPipeline>,
        worker_call_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            registry,
            cache,
            pipeline,
            worker_call_timeout,
        }
    }

    /// Run every domain detector over the text with no early exit. When
    /// more than one domain fires, emit one synthetic request per
    /// (domain, worker) pair; otherwise the input is not a fan-out case.
    pub fn analyze(
        &self,
        text: &str,
        source_worker: &str,
        conversation_id: &str,
    ) -> Vec<HandoffRequest> {
        let matches = self.classifier.detect_all(text);
        if matches.len() < 2 {
            return Vec::new();
        }

        matches
            .iter()
            .filter_map(|m| {
                let worker = self.worker_for(&m.domain)?;
                Some(
                    HandoffRequest::new(source_worker, worker, conversation_id)
                        .with_reason(format!("parallel dispatch for {} domain", m.domain))
                        .with_required_capabilities([m.domain.clone()])
                        .with_context_entry(QUERY_CONTEXT_KEY, serde_json::json!(text)),
                )
            })
            .collect()
    }

    fn worker_for(&self, domain: &str) -> Option<String> {
        if let Some(worker) = self.classifier.worker_for_domain(domain) {
            return Some(worker.to_string());
        }
        self.registry
            .find_by_capabilities(&[domain.to_string()])
            .first()
            .map(|profile| profile.id.clone())
    }

    /// Dispatch all requests concurrently and collect one outcome per
    /// request, in request order. Each call carries its own time budget.
    pub async fn execute(
        &self,
        requests: &[HandoffRequest],
        conversation_id: &str,
    ) -> ParallelHandoffResult {
        let started = Instant::now();
        let query = requests
            .first()
            .and_then(|r| r.context.get(QUERY_CONTEXT_KEY))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let bypass = requests
            .first()
            .map(|r| self.cache.should_bypass(&query, &r.context))
            .unwrap_or(true);

        if !bypass {
            if let Some(cached) = self.cache.get_parallel(&query).await {
                return cached;
            }
        }

        let outcomes = join_all(
            requests
                .iter()
                .map(|request| self.dispatch(request, &query)),
        )
        .await;

        let total_duration_ms = started.elapsed().as_millis() as u64;
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        self.pipeline.emit(HandoffEvent::ParallelBatchCompleted {
            conversation_id: conversation_id.to_string(),
            dispatched: outcomes.len(),
            failed,
            duration_ms: total_duration_ms,
        });

        let merged_response = Some(self.merge(&outcomes, &query));
        let result = ParallelHandoffResult {
            status: BatchStatus::from_outcomes(&outcomes),
            outcomes,
            total_duration_ms,
            merged_response,
        };

        if !bypass {
            self.cache.put_parallel(&query, &result).await;
        }
        result
    }

    async fn dispatch(&self, request: &HandoffRequest, query: &str) -> WorkerOutcome {
        let worker_id = request.target_worker.clone();
        let started = Instant::now();

        let bypass = self.cache.should_bypass(query, &request.context);
        if !bypass {
            if let Some(cached) = self.cache.get_response(&worker_id, query).await {
                return WorkerOutcome::success(
                    &worker_id,
                    cached,
                    started.elapsed().as_millis() as u64,
                    true,
                );
            }
        }

        let Some(handle) = self.registry.handle(&worker_id) else {
            return WorkerOutcome::failed(
                &worker_id,
                format!("worker {worker_id} is not registered"),
                started.elapsed().as_millis() as u64,
            );
        };

        match timeout(self.worker_call_timeout, handle.chat(query)).await {
            Ok(Ok(response)) => {
                if !bypass {
                    self.cache.put_response(&worker_id, query, &response).await;
                }
                WorkerOutcome::success(
                    &worker_id,
                    response,
                    started.elapsed().as_millis() as u64,
                    false,
                )
            }
            Ok(Err(error)) => WorkerOutcome::failed(
                &worker_id,
                error.to_string(),
                started.elapsed().as_millis() as u64,
            ),
            Err(_elapsed) => {
                WorkerOutcome::timed_out(&worker_id, started.elapsed().as_millis() as u64)
            }
        }
    }

    /// Combine successful outcomes into one response text.
    pub fn merge(&self, outcomes: &[WorkerOutcome], original_query: &str) -> String {
        let successes: Vec<&WorkerOutcome> =
            outcomes.iter().filter(|o| o.is_success()).collect();

        match successes.as_slice() {
            [] => EMPTY_MERGE_MESSAGE.to_string(),
            [only] => format!(
                "[{}]\n{}",
                self.label_for(&only.worker),
                only.response.as_deref().unwrap_or_default()
            ),
            several => {
                let mut merged = String::new();
                for outcome in several {
                    merged.push_str(&format!(
                        "### {}\n{}\n\n",
                        self.label_for(&outcome.worker),
                        outcome.response.as_deref().unwrap_or_default()
                    ));
                }
                merged.push_str(&format!(
                    "---\nCombined {} specialist responses for: {}",
                    several.len(),
                    original_query
                ));
                merged
            }
        }
    }

    fn label_for(&self, worker_id: &str) -> String {
        self.registry
            .get(worker_id)
            .map(|profile| profile.label().to_string())
            .unwrap_or_else(|| worker_id.to_string())
    }
}

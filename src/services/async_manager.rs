//! Deferred handoff execution.
//!
//! A submitted handoff becomes a job running off the caller's path on a
//! detached task. Jobs advance through the fixed step sequence, retry up to
//! an attempt ceiling, honor best-effort cancellation between steps, and
//! expire from the status table after a retention window.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::{
    HandoffEvent, HandoffRequest, JobConfig, JobOptions, JobRecord, JobState, JobStatus, JobStep,
};
use crate::domain::ports::{Clock, IdGenerator};
use crate::services::orchestrator::HandoffOrchestrator;
use crate::services::trace::EventPipeline;

type JobTable = Arc<RwLock<HashMap<String, JobRecord>>>;

/// Submits handoffs as deferred jobs and tracks their status.
pub struct AsyncHandoffManager {
    orchestrator: Arc<HandoffOrchestrator>,
    jobs: JobTable,
    pipeline: Arc<EventPipeline>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    config: JobConfig,
}

impl AsyncHandoffManager {
    pub fn new(
        orchestrator: Arc<HandoffOrchestrator>,
        pipeline: Arc<EventPipeline>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        config: JobConfig,
    ) -> Self {
        Self {
            orchestrator,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            pipeline,
            ids,
            clock,
            config,
        }
    }

    /// Submit a handoff for deferred execution. Returns the job id for
    /// status polling and cancellation.
    pub async fn submit(&self, request: HandoffRequest, options: JobOptions) -> String {
        self.purge_expired().await;

        let job_id = format!("job-{}", self.ids.generate());
        let max_attempts = options.max_attempts.unwrap_or(self.config.max_attempts).max(1);
        let record = JobRecord::new(&job_id, request, max_attempts, self.clock.now());

        self.jobs.write().await.insert(job_id.clone(), record);
        self.emit_state(&job_id, JobState::Pending, 0);

        let runner = Runner {
            orchestrator: Arc::clone(&self.orchestrator),
            jobs: Arc::clone(&self.jobs),
            pipeline: Arc::clone(&self.pipeline),
            clock: Arc::clone(&self.clock),
        };
        let run_id = job_id.clone();
        tokio::spawn(async move { runner.run(run_id).await });

        job_id
    }

    /// Non-blocking status snapshot. `None` for unknown ids and for jobs
    /// whose retention window has elapsed.
    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        let jobs = self.jobs.read().await;
        let record = jobs.get(job_id)?;
        if record.is_expired(self.clock.now(), self.config.retention_secs) {
            return None;
        }
        Some(record.status())
    }

    /// Request cancellation. Returns true when the job was still pending or
    /// processing; the transition is immediate, but a step already in
    /// flight cannot be interrupted and its effects may still land.
    pub async fn cancel(&self, job_id: &str) -> bool {
        let cancelled = {
            let mut jobs = self.jobs.write().await;
            match jobs.get_mut(job_id) {
                Some(record) if !record.state.is_terminal() => {
                    record.cancel_requested = true;
                    record.state = JobState::Cancelled;
                    record.updated_at = self.clock.now();
                    Some(record.progress)
                }
                _ => None,
            }
        };

        match cancelled {
            Some(progress) => {
                self.emit_state(job_id, JobState::Cancelled, progress);
                true
            }
            None => false,
        }
    }

    /// Drop expired job records.
    pub async fn purge_expired(&self) {
        let now = self.clock.now();
        self.jobs
            .write()
            .await
            .retain(|_, record| !record.is_expired(now, self.config.retention_secs));
    }

    /// Number of tracked jobs, for diagnostics.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    fn emit_state(&self, job_id: &str, state: JobState, progress: u8) {
        self.pipeline.emit(HandoffEvent::JobStateChanged {
            job_id: job_id.to_string(),
            state: state.as_str().to_string(),
            progress,
        });
    }
}

enum StepOutcome {
    Done,
    Context(HashMap<String, serde_json::Value>),
}

/// Detached task advancing one job through the step sequence.
struct Runner {
    orchestrator: Arc<HandoffOrchestrator>,
    jobs: JobTable,
    pipeline: Arc<EventPipeline>,
    clock: Arc<dyn Clock>,
}

impl Runner {
    async fn run(&self, job_id: String) {
        loop {
            // Begin an attempt; stop if the job was cancelled meanwhile.
            let Some((mut request, attempts, max_attempts)) = self
                .update(&job_id, |record| {
                    record.state = JobState::Processing;
                    record.attempts += 1;
                    record.progress = 0;
                    record.current_step = None;
                    record.error = None;
                    (record.request.clone(), record.attempts, record.max_attempts)
                })
                .await
            else {
                return;
            };
            self.emit_state(&job_id, JobState::Processing, 0);

            let mut failure: Option<String> = None;
            for step in JobStep::SEQUENCE {
                // Cancellation is honored between steps; a step in flight
                // is never interrupted.
                if self.is_cancelled(&job_id).await {
                    return;
                }

                match self.run_step(&job_id, step, &request).await {
                    Ok(StepOutcome::Context(merged)) => {
                        request = request.clone().with_context(merged);
                        if !self.mark_step(&job_id, step, &request).await {
                            return;
                        }
                    }
                    Ok(StepOutcome::Done) => {
                        if !self.mark_step(&job_id, step, &request).await {
                            return;
                        }
                    }
                    Err(message) => {
                        failure = Some(message);
                        break;
                    }
                }
            }

            match failure {
                None => {
                    let applied = self
                        .update(&job_id, |record| {
                            record.state = JobState::Completed;
                            record.progress = 100;
                        })
                        .await;
                    if applied.is_some() {
                        self.emit_state(&job_id, JobState::Completed, 100);
                    }
                    return;
                }
                Some(message) if attempts >= max_attempts => {
                    let applied = self
                        .update(&job_id, |record| {
                            record.state = JobState::Failed;
                            record.error = Some(message.clone());
                        })
                        .await;
                    if applied.is_some() {
                        self.emit_state(&job_id, JobState::Failed, 0);
                    }
                    return;
                }
                Some(_) => {
                    // Attempts remain; retry from the first step.
                }
            }
        }
    }

    async fn run_step(
        &self,
        job_id: &str,
        step: JobStep,
        request: &HandoffRequest,
    ) -> Result<StepOutcome, String> {
        match step {
            JobStep::Validate => {
                let verdict = self.orchestrator.validate_request(request).await;
                if verdict.is_valid() {
                    Ok(StepOutcome::Done)
                } else {
                    Err(verdict.error_summary())
                }
            }
            JobStep::CheckPermissions => {
                if self
                    .orchestrator
                    .permission_allows(&request.source_worker, &request.target_worker)
                {
                    Ok(StepOutcome::Done)
                } else {
                    Err(format!(
                        "{} is not permitted to hand off to {}",
                        request.source_worker, request.target_worker
                    ))
                }
            }
            JobStep::PrepareContext => self
                .orchestrator
                .merged_context(&request.conversation_id, &request.context)
                .await
                .map(StepOutcome::Context)
                .map_err(|e| e.to_string()),
            JobStep::Execute => {
                let result = self.orchestrator.handle(request.clone()).await;
                if result.is_success() {
                    self.update(job_id, |record| {
                        record.result = Some(result.clone());
                    })
                    .await;
                    Ok(StepOutcome::Done)
                } else {
                    Err(result
                        .error
                        .unwrap_or_else(|| "handoff failed".to_string()))
                }
            }
            JobStep::Finalize => Ok(StepOutcome::Done),
        }
    }

    /// Record step completion and progress. False when the job is gone or
    /// terminal and the runner must stop.
    async fn mark_step(&self, job_id: &str, step: JobStep, request: &HandoffRequest) -> bool {
        let applied = self
            .update(job_id, |record| {
                record.progress = step.progress_after();
                record.current_step = Some(step);
                record.request = request.clone();
            })
            .await;
        if applied.is_some() {
            self.emit_state(job_id, JobState::Processing, step.progress_after());
            true
        } else {
            false
        }
    }

    /// Apply a mutation to the job unless it reached a terminal state.
    /// Returns `None` when the job is gone or terminal, which tells the
    /// runner to stop without touching it further.
    async fn update<T>(&self, job_id: &str, f: impl FnOnce(&mut JobRecord) -> T) -> Option<T> {
        let mut jobs = self.jobs.write().await;
        let record = jobs.get_mut(job_id)?;
        if record.state.is_terminal() {
            return None;
        }
        let value = f(record);
        record.updated_at = self.clock.now();
        Some(value)
    }

    async fn is_cancelled(&self, job_id: &str) -> bool {
        let jobs = self.jobs.read().await;
        jobs.get(job_id)
            .map(|record| record.cancel_requested || record.state.is_terminal())
            .unwrap_or(true)
    }

    fn emit_state(&self, job_id: &str, state: JobState, progress: u8) {
        self.pipeline.emit(HandoffEvent::JobStateChanged {
            job_id: job_id.to_string(),
            state: state.as_str().to_string(),
            progress,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryConversationStore, MokaCache};
    use crate::adapters::sinks::CollectingSink;
    use crate::adapters::system::{SystemClock, UuidGenerator};
    use crate::domain::error::HandoffError;
    use crate::domain::models::{Config, HandoffRecord};
    use crate::domain::ports::{ChatWorker, ConversationStore};
    use crate::services::classifier::KeywordClassifier;
    use crate::services::cache_manager::CacheManager;
    use crate::services::registry::WorkerRegistry;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubWorker {
        id: String,
        capabilities: Vec<String>,
    }

    #[async_trait]
    impl ChatWorker for StubWorker {
        fn id(&self) -> &str {
            &self.id
        }

        fn capabilities(&self) -> Vec<String> {
            self.capabilities.clone()
        }

        async fn chat(&self, _input: &str) -> Result<String, HandoffError> {
            Ok(String::new())
        }
    }

    /// Store whose history reads stall, keeping the validate step in
    /// flight long enough for cancellation tests.
    struct SlowStore {
        inner: MemoryConversationStore,
        delay: Duration,
    }

    #[async_trait]
    impl ConversationStore for SlowStore {
        async fn append_handoff(
            &self,
            conversation_id: &str,
            record: HandoffRecord,
        ) -> AnyResult<()> {
            self.inner.append_handoff(conversation_id, record).await
        }

        async fn history(&self, conversation_id: &str) -> AnyResult<Vec<HandoffRecord>> {
            tokio::time::sleep(self.delay).await;
            self.inner.history(conversation_id).await
        }

        async fn save_context(
            &self,
            conversation_id: &str,
            context: &HashMap<String, serde_json::Value>,
        ) -> AnyResult<()> {
            self.inner.save_context(conversation_id, context).await
        }

        async fn load_context(
            &self,
            conversation_id: &str,
        ) -> AnyResult<HashMap<String, serde_json::Value>> {
            self.inner.load_context(conversation_id).await
        }
    }

    fn manager_with(store: Arc<dyn ConversationStore>, config: Config) -> AsyncHandoffManager {
        let mut registry = WorkerRegistry::new();
        for (id, caps) in [
            ("generalist", vec!["general"]),
            ("math-tutor", vec!["mathematics"]),
        ] {
            registry.register(Arc::new(StubWorker {
                id: id.to_string(),
                capabilities: caps.into_iter().map(ToString::to_string).collect(),
            }));
        }
        let registry = Arc::new(registry);

        let classifier = Arc::new(KeywordClassifier::with_default_detectors(
            config.routing.clone(),
        ));
        let clock = Arc::new(SystemClock);
        let pipeline = Arc::new(EventPipeline::new(
            vec![Arc::new(CollectingSink::new())],
            clock.clone(),
        ));
        let cache = Arc::new(CacheManager::new(
            Arc::new(MokaCache::new(config.cache.max_capacity)),
            pipeline.clone(),
            config.cache.clone(),
        ));

        let orchestrator = Arc::new(HandoffOrchestrator::new(
            registry,
            classifier,
            store,
            cache,
            pipeline.clone(),
            Arc::new(UuidGenerator),
            clock.clone(),
            config.clone(),
        ));

        AsyncHandoffManager::new(
            orchestrator,
            pipeline,
            Arc::new(UuidGenerator),
            clock,
            config.jobs.clone(),
        )
    }

    fn manager() -> AsyncHandoffManager {
        manager_with(Arc::new(MemoryConversationStore::new()), Config::default())
    }

    async fn wait_for_terminal(manager: &AsyncHandoffManager, job_id: &str) -> JobStatus {
        for _ in 0..200 {
            if let Some(status) = manager.status(job_id).await {
                if status.state.is_terminal() {
                    return status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_job_completes_with_result() {
        let manager = manager();
        let request = HandoffRequest::new("generalist", "math-tutor", "conv-1");
        let job_id = manager.submit(request, JobOptions::default()).await;
        assert!(job_id.starts_with("job-"));

        let status = wait_for_terminal(&manager, &job_id).await;
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.progress, 100);
        let result = status.result.unwrap();
        assert!(result.is_success());
        assert_eq!(result.target_worker, "math-tutor");
    }

    #[tokio::test]
    async fn test_invalid_request_fails_after_retries() {
        let manager = manager();
        // Self-handoff never validates; the job burns its attempts and fails.
        let request = HandoffRequest::new("generalist", "generalist", "conv-1");
        let job_id = manager
            .submit(request, JobOptions::default().with_max_attempts(2))
            .await;

        let status = wait_for_terminal(&manager, &job_id).await;
        assert_eq!(status.state, JobState::Failed);
        assert!(status.error.as_deref().unwrap().contains("itself"));
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let manager = manager();
        assert!(manager.status("job-missing").await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_before_processing_completes() {
        let store = Arc::new(SlowStore {
            inner: MemoryConversationStore::new(),
            delay: Duration::from_millis(200),
        });
        let manager = manager_with(store, Config::default());

        let request = HandoffRequest::new("generalist", "math-tutor", "conv-1");
        let job_id = manager.submit(request, JobOptions::default()).await;

        // The validate step is stalled on the slow store; cancel lands first.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(manager.cancel(&job_id).await);

        let status = manager.status(&job_id).await.unwrap();
        assert_eq!(status.state, JobState::Cancelled);
        let progress_at_cancel = status.progress;

        // No further progress updates after cancellation.
        tokio::time::sleep(Duration::from_millis(400)).await;
        let status = manager.status(&job_id).await.unwrap();
        assert_eq!(status.state, JobState::Cancelled);
        assert_eq!(status.progress, progress_at_cancel);

        // Cancelling a terminal job reports false.
        assert!(!manager.cancel(&job_id).await);
    }

    #[tokio::test]
    async fn test_expired_job_reports_not_found() {
        let config = Config {
            jobs: JobConfig {
                retention_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let manager = manager_with(Arc::new(MemoryConversationStore::new()), config);

        let request = HandoffRequest::new("generalist", "math-tutor", "conv-1");
        let job_id = manager.submit(request, JobOptions::default()).await;

        // Zero retention: the job expires from the status table immediately.
        assert!(manager.status(&job_id).await.is_none());

        manager.purge_expired().await;
        assert_eq!(manager.job_count().await, 0);
    }
}

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use switchboard::adapters::memory::{MemoryConversationStore, MokaCache};
use switchboard::adapters::sinks::CollectingSink;
use switchboard::adapters::system::{SystemClock, UuidGenerator};
use switchboard::domain::models::Config;
use switchboard::services::{
    AsyncHandoffManager, CacheManager, EventPipeline, HandoffOrchestrator, KeywordClassifier,
    ParallelHandoffManager, ReversibleHandoffManager, WorkerRegistry,
};
use switchboard::{ChatWorker, HandoffError};

/// How a stub worker responds to chat calls.
pub enum Behavior {
    /// Reply with "<id>: <input>"
    Echo,
    /// Fail with a provider error
    Fail,
    /// Sleep for the duration, then echo
    Slow(Duration),
}

/// Scripted worker for tests.
pub struct StubWorker {
    pub id: String,
    pub capabilities: Vec<String>,
    pub behavior: Behavior,
}

impl StubWorker {
    pub fn echo(id: &str, capabilities: &[&str]) -> Arc<Self> {
        Self::with_behavior(id, capabilities, Behavior::Echo)
    }

    pub fn failing(id: &str, capabilities: &[&str]) -> Arc<Self> {
        Self::with_behavior(id, capabilities, Behavior::Fail)
    }

    pub fn slow(id: &str, capabilities: &[&str], delay: Duration) -> Arc<Self> {
        Self::with_behavior(id, capabilities, Behavior::Slow(delay))
    }

    pub fn with_behavior(id: &str, capabilities: &[&str], behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            capabilities: capabilities.iter().map(ToString::to_string).collect(),
            behavior,
        })
    }
}

#[async_trait]
impl ChatWorker for StubWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Vec<String> {
        self.capabilities.clone()
    }

    async fn chat(&self, input: &str) -> Result<String, HandoffError> {
        match &self.behavior {
            Behavior::Echo => Ok(format!("{}: {}", self.id, input)),
            Behavior::Fail => Err(HandoffError::Provider {
                worker: self.id.clone(),
                message: "provider unavailable".to_string(),
            }),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(format!("{}: {}", self.id, input))
            }
        }
    }
}

/// Fully wired engine over in-memory adapters.
pub struct Harness {
    pub orchestrator: Arc<HandoffOrchestrator>,
    pub parallel: ParallelHandoffManager,
    pub async_manager: AsyncHandoffManager,
    pub reversible: ReversibleHandoffManager,
    pub store: Arc<MemoryConversationStore>,
    pub sink: Arc<CollectingSink>,
    pub cache: Arc<CacheManager>,
}

/// Standard specialist pool used by most tests.
pub fn default_workers() -> Vec<Arc<StubWorker>> {
    vec![
        StubWorker::echo("generalist", &["general"]),
        StubWorker::echo("math-tutor", &["mathematics"]),
        StubWorker::echo("historian", &["history"]),
        StubWorker::echo("scientist", &["science"]),
        StubWorker::echo("coder", &["programming"]),
        StubWorker::echo("travel-agent", &["travel"]),
    ]
}

pub fn harness() -> Harness {
    harness_with(Config::default(), default_workers())
}

pub fn harness_with(config: Config, workers: Vec<Arc<StubWorker>>) -> Harness {
    let mut registry = WorkerRegistry::new();
    for worker in workers {
        registry.register(worker);
    }
    let registry = Arc::new(registry);

    let mut classifier = KeywordClassifier::with_default_detectors(config.routing.clone());
    for (domain, worker) in [
        ("mathematics", "math-tutor"),
        ("history", "historian"),
        ("science", "scientist"),
        ("programming", "coder"),
        ("travel", "travel-agent"),
    ] {
        classifier = classifier.with_domain_worker(domain, worker);
    }
    let classifier = Arc::new(classifier);

    let sink = Arc::new(CollectingSink::new());
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UuidGenerator);
    let pipeline = Arc::new(EventPipeline::new(vec![sink.clone()], clock.clone()));
    let cache = Arc::new(CacheManager::new(
        Arc::new(MokaCache::new(config.cache.max_capacity)),
        pipeline.clone(),
        config.cache.clone(),
    ));
    let store = Arc::new(MemoryConversationStore::new());

    let orchestrator = Arc::new(HandoffOrchestrator::new(
        Arc::clone(&registry),
        classifier.clone(),
        store.clone(),
        cache.clone(),
        pipeline.clone(),
        ids.clone(),
        clock.clone(),
        config.clone(),
    ));

    let parallel = ParallelHandoffManager::new(
        classifier,
        registry,
        cache.clone(),
        pipeline.clone(),
        Duration::from_secs(config.timeouts.worker_call_secs),
    );

    let async_manager = AsyncHandoffManager::new(
        orchestrator.clone(),
        pipeline,
        ids.clone(),
        clock.clone(),
        config.jobs.clone(),
    );

    let reversible = ReversibleHandoffManager::new(
        store.clone(),
        ids,
        config.routing.reversal_confidence_ceiling,
    );

    Harness {
        orchestrator,
        parallel,
        async_manager,
        reversible,
        store,
        sink,
        cache,
    }
}

//! Request-level caching over the injected backend.
//!
//! Four independent keyspaces, each with its own TTL, keyed by a SHA-256
//! fingerprint of normalized input plus a context discriminator. The bypass
//! policy is decided here; callers must consult it before reading.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::models::{
    CacheConfig, HandoffEvent, HandoffSuggestion, ParallelHandoffResult, ValidationResult,
};
use crate::domain::ports::CacheBackend;
use crate::services::trace::EventPipeline;

/// Vocabulary that marks an input as time-sensitive and uncacheable.
static TIME_SENSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(now|today|tonight|latest|current|currently|breaking|right away)\b")
        .expect("time-sensitive pattern compiles")
});

/// Context keys that identify a user or session; responses keyed to a
/// person must not be shared through the cache.
const IDENTITY_KEYS: [&str; 3] = ["user_id", "session_id", "account_id"];

/// The four cache keyspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Classifier suggestions
    Suggestion,
    /// Individual worker chat responses
    WorkerResponse,
    /// Merged parallel batch results
    ParallelResult,
    /// Validation verdicts
    ValidationVerdict,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::WorkerResponse => "worker_response",
            Self::ParallelResult => "parallel_result",
            Self::ValidationVerdict => "validation_verdict",
        }
    }
}

/// TTL-aware cache facade for suggestions, responses, batch results, and
/// validation verdicts.
pub struct CacheManager {
    backend: Arc<dyn CacheBackend>,
    pipeline: Arc<EventPipeline>,
    config: CacheConfig,
}

impl CacheManager {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        pipeline: Arc<EventPipeline>,
        config: CacheConfig,
    ) -> Self {
        Self {
            backend,
            pipeline,
            config,
        }
    }

    /// Whether a lookup must skip the cache: time-sensitive vocabulary, an
    /// identity key in the context, or an input past the length threshold.
    pub fn should_bypass(
        &self,
        text: &str,
        context: &HashMap<String, serde_json::Value>,
    ) -> bool {
        if text.chars().count() > self.config.bypass_max_input_len {
            return true;
        }
        if IDENTITY_KEYS.iter().any(|key| context.contains_key(*key)) {
            return true;
        }
        TIME_SENSITIVE.is_match(&text.to_lowercase())
    }

    /// Fingerprint for a keyspace: normalized input hashed together with
    /// the context discriminators.
    pub fn fingerprint(kind: CacheKind, text: &str, context_parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalize(text).as_bytes());
        for part in context_parts {
            hasher.update([0u8]);
            hasher.update(part.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        format!("{}:{}", kind.as_str(), digest)
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        kind: CacheKind,
        text: &str,
        context_parts: &[&str],
    ) -> Option<T> {
        let key = Self::fingerprint(kind, text, context_parts);
        let value = self.backend.get(&key).await;
        self.pipeline.emit(HandoffEvent::CacheLookup {
            keyspace: kind.as_str().to_string(),
            hit: value.is_some(),
        });
        value.and_then(|v| serde_json::from_value(v).ok())
    }

    async fn put<T: serde::Serialize>(
        &self,
        kind: CacheKind,
        text: &str,
        context_parts: &[&str],
        value: &T,
        ttl_secs: u64,
    ) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        let key = Self::fingerprint(kind, text, context_parts);
        self.backend
            .put(&key, value, Duration::from_secs(ttl_secs))
            .await;
    }

    /// Cached suggestion for an input and current worker.
    pub async fn get_suggestion(
        &self,
        text: &str,
        current_worker: &str,
    ) -> Option<HandoffSuggestion> {
        self.get(CacheKind::Suggestion, text, &[current_worker]).await
    }

    /// Memoize a suggestion.
    pub async fn put_suggestion(
        &self,
        text: &str,
        current_worker: &str,
        suggestion: &HandoffSuggestion,
    ) {
        self.put(
            CacheKind::Suggestion,
            text,
            &[current_worker],
            suggestion,
            self.config.suggestion_ttl_secs,
        )
        .await;
    }

    /// Cached chat response from one worker.
    pub async fn get_response(&self, worker: &str, text: &str) -> Option<String> {
        self.get(CacheKind::WorkerResponse, text, &[worker]).await
    }

    /// Memoize a worker's chat response.
    pub async fn put_response(&self, worker: &str, text: &str, response: &str) {
        self.put(
            CacheKind::WorkerResponse,
            text,
            &[worker],
            &response.to_string(),
            self.config.response_ttl_secs,
        )
        .await;
    }

    /// Cached parallel batch result for an input.
    pub async fn get_parallel(&self, text: &str) -> Option<ParallelHandoffResult> {
        self.get(CacheKind::ParallelResult, text, &[]).await
    }

    /// Memoize a parallel batch result.
    pub async fn put_parallel(&self, text: &str, result: &ParallelHandoffResult) {
        self.put(
            CacheKind::ParallelResult,
            text,
            &[],
            result,
            self.config.parallel_ttl_secs,
        )
        .await;
    }

    /// Cached validation verdict. `discriminator` must change whenever the
    /// inputs the validator reads change; the orchestrator passes the
    /// conversation id and history length.
    pub async fn get_validation(
        &self,
        request_fingerprint: &str,
        discriminator: &str,
    ) -> Option<ValidationResult> {
        self.get(
            CacheKind::ValidationVerdict,
            request_fingerprint,
            &[discriminator],
        )
        .await
    }

    /// Memoize a validation verdict.
    pub async fn put_validation(
        &self,
        request_fingerprint: &str,
        discriminator: &str,
        verdict: &ValidationResult,
    ) {
        self.put(
            CacheKind::ValidationVerdict,
            request_fingerprint,
            &[discriminator],
            verdict,
            self.config.validation_ttl_secs,
        )
        .await;
    }

    /// Drop one cached worker response.
    pub async fn forget_response(&self, worker: &str, text: &str) {
        let key = Self::fingerprint(CacheKind::WorkerResponse, text, &[worker]);
        self.backend.forget(&key).await;
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

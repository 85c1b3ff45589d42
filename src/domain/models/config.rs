//! Configuration model: the read-only policy surface of the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Recovery strategy applied after a failed handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackKind {
    /// Search the registry for another worker with the required capabilities
    RetryWithDifferentWorker,
    /// Route to the configured generic worker
    DegradeToGeneral,
    /// Leave control with the source worker and report failure
    ReturnToSource,
}

impl FallbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RetryWithDifferentWorker => "retry_with_different_worker",
            Self::DegradeToGeneral => "degrade_to_general",
            Self::ReturnToSource => "return_to_source",
        }
    }
}

/// Main configuration structure for Switchboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Routing and classification thresholds
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Per-conversation limits and payload policy
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Permission graph: source worker -> allowed targets
    #[serde(default)]
    pub permissions: PermissionsConfig,

    /// Fallback strategy selection
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Cache TTLs and bypass policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// Time budgets
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Deferred job processing
    #[serde(default)]
    pub jobs: JobConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Routing and classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingConfig {
    /// Worker that absorbs generic, ambiguous, and degraded traffic
    #[serde(default = "default_generic_worker")]
    pub generic_worker: String,

    /// Minimum suggestion confidence for the intelligent handoff path
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Confidence floor below which a match degrades to the generic worker
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,

    /// Bonus added when a specialist differs from the current worker
    #[serde(default = "default_suggestion_bonus")]
    pub suggestion_bonus: f64,

    /// Fixed confidence of an ambiguous multi-domain suggestion
    #[serde(default = "default_ambiguous_confidence")]
    pub ambiguous_confidence: f64,

    /// Fixed confidence of a specific-pattern suggestion
    #[serde(default = "default_pattern_confidence")]
    pub pattern_confidence: f64,

    /// Suggestions below this confidence are treated as reversible
    #[serde(default = "default_reversal_ceiling")]
    pub reversal_confidence_ceiling: f64,
}

fn default_generic_worker() -> String {
    "generalist".to_string()
}

const fn default_confidence_threshold() -> f64 {
    0.7
}

const fn default_confidence_floor() -> f64 {
    0.5
}

const fn default_suggestion_bonus() -> f64 {
    0.15
}

const fn default_ambiguous_confidence() -> f64 {
    0.3
}

const fn default_pattern_confidence() -> f64 {
    0.55
}

const fn default_reversal_ceiling() -> f64 {
    0.6
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            generic_worker: default_generic_worker(),
            confidence_threshold: default_confidence_threshold(),
            confidence_floor: default_confidence_floor(),
            suggestion_bonus: default_suggestion_bonus(),
            ambiguous_confidence: default_ambiguous_confidence(),
            pattern_confidence: default_pattern_confidence(),
            reversal_confidence_ceiling: default_reversal_ceiling(),
        }
    }
}

/// Per-conversation limits and payload policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Ceiling on admitted handoffs per conversation
    #[serde(default = "default_max_handoffs")]
    pub max_handoffs_per_conversation: usize,

    /// Soft limit on serialized context size in bytes
    #[serde(default = "default_max_context_bytes")]
    pub max_context_bytes: usize,

    /// Context size beyond `multiplier * soft limit` becomes a hard error.
    /// Inherited constant; tunable but not load-bearing.
    #[serde(default = "default_hard_error_multiplier")]
    pub hard_error_multiplier: f64,

    /// How many recent handoffs the cycle scan inspects.
    /// Inherited constant; tunable but not load-bearing.
    #[serde(default = "default_cycle_window")]
    pub cycle_window: usize,
}

const fn default_max_handoffs() -> usize {
    10
}

const fn default_max_context_bytes() -> usize {
    8192
}

const fn default_hard_error_multiplier() -> f64 {
    2.0
}

const fn default_cycle_window() -> usize {
    3
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_handoffs_per_conversation: default_max_handoffs(),
            max_context_bytes: default_max_context_bytes(),
            hard_error_multiplier: default_hard_error_multiplier(),
            cycle_window: default_cycle_window(),
        }
    }
}

/// Permission graph. A source with no entry may target anyone; an entry is
/// an allowlist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PermissionsConfig {
    /// source worker id -> allowed target worker ids
    #[serde(default)]
    pub graph: HashMap<String, Vec<String>>,
}

impl PermissionsConfig {
    /// Whether `source` may hand off to `target`.
    pub fn allows(&self, source: &str, target: &str) -> bool {
        match self.graph.get(source) {
            Some(allowed) => allowed.iter().any(|t| t == target),
            None => true,
        }
    }
}

/// Fallback strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FallbackConfig {
    /// Strategy when no explicit fallback, override, or category match applies
    #[serde(default = "default_fallback_strategy")]
    pub default_strategy: FallbackKind,

    /// Per-target strategy overrides: target worker id -> strategy
    #[serde(default)]
    pub overrides: HashMap<String, FallbackKind>,
}

const fn default_fallback_strategy() -> FallbackKind {
    FallbackKind::DegradeToGeneral
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_strategy: default_fallback_strategy(),
            overrides: HashMap::new(),
        }
    }
}

/// Cache TTLs per keyspace and the bypass policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// TTL for cached suggestions, in seconds
    #[serde(default = "default_suggestion_ttl")]
    pub suggestion_ttl_secs: u64,

    /// TTL for cached worker responses, in seconds
    #[serde(default = "default_response_ttl")]
    pub response_ttl_secs: u64,

    /// TTL for cached parallel batch results, in seconds
    #[serde(default = "default_parallel_ttl")]
    pub parallel_ttl_secs: u64,

    /// TTL for cached validation verdicts, in seconds
    #[serde(default = "default_validation_ttl")]
    pub validation_ttl_secs: u64,

    /// Inputs longer than this many characters bypass the cache
    #[serde(default = "default_bypass_max_input_len")]
    pub bypass_max_input_len: usize,

    /// Entry capacity of the backing cache
    #[serde(default = "default_cache_capacity")]
    pub max_capacity: u64,
}

const fn default_suggestion_ttl() -> u64 {
    300
}

const fn default_response_ttl() -> u64 {
    600
}

const fn default_parallel_ttl() -> u64 {
    300
}

const fn default_validation_ttl() -> u64 {
    60
}

const fn default_bypass_max_input_len() -> usize {
    100
}

const fn default_cache_capacity() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            suggestion_ttl_secs: default_suggestion_ttl(),
            response_ttl_secs: default_response_ttl(),
            parallel_ttl_secs: default_parallel_ttl(),
            validation_ttl_secs: default_validation_ttl(),
            bypass_max_input_len: default_bypass_max_input_len(),
            max_capacity: default_cache_capacity(),
        }
    }
}

/// Time budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeoutConfig {
    /// Budget for one handoff attempt end to end, in seconds
    #[serde(default = "default_handoff_timeout")]
    pub handoff_secs: u64,

    /// Budget for one worker chat call during fan-out, in seconds
    #[serde(default = "default_worker_call_timeout")]
    pub worker_call_secs: u64,
}

const fn default_handoff_timeout() -> u64 {
    30
}

const fn default_worker_call_timeout() -> u64 {
    10
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handoff_secs: default_handoff_timeout(),
            worker_call_secs: default_worker_call_timeout(),
        }
    }
}

/// Deferred job processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobConfig {
    /// Attempts before a job is marked failed
    #[serde(default = "default_job_attempts")]
    pub max_attempts: u32,

    /// Seconds a finished job's metadata remains queryable
    #[serde(default = "default_job_retention")]
    pub retention_secs: u64,
}

const fn default_job_attempts() -> u32 {
    3
}

const fn default_job_retention() -> u64 {
    3600
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_job_attempts(),
            retention_secs: default_job_retention(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

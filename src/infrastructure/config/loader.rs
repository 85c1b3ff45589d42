use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid confidence threshold: {0}. Must be within 0.0..=1.0")]
    InvalidConfidenceThreshold(f64),

    #[error("Invalid confidence floor: {0}. Must be within 0.0..=1.0")]
    InvalidConfidenceFloor(f64),

    #[error("Generic worker id cannot be empty")]
    EmptyGenericWorker,

    #[error("Invalid max_handoffs_per_conversation: {0}. Must be at least 1")]
    InvalidMaxHandoffs(usize),

    #[error("Invalid max_context_bytes: {0}. Must be at least 1")]
    InvalidMaxContextBytes(usize),

    #[error("Invalid hard_error_multiplier: {0}. Must be at least 1.0")]
    InvalidHardErrorMultiplier(f64),

    #[error("Invalid handoff time budget: {0}s. Must be at least 1")]
    InvalidHandoffTimeout(u64),

    #[error("Invalid job max_attempts: {0}. Cannot be 0")]
    InvalidJobAttempts(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .switchboard/config.yaml (project config)
    /// 3. .switchboard/local.yaml (local overrides, optional)
    /// 4. Environment variables (`SWITCHBOARD_*` prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".switchboard/config.yaml"))
            .merge(Yaml::file(".switchboard/local.yaml"))
            .merge(Env::prefixed("SWITCHBOARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let routing = &config.routing;
        if !(0.0..=1.0).contains(&routing.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                routing.confidence_threshold,
            ));
        }
        if !(0.0..=1.0).contains(&routing.confidence_floor) {
            return Err(ConfigError::InvalidConfidenceFloor(routing.confidence_floor));
        }
        if routing.generic_worker.is_empty() {
            return Err(ConfigError::EmptyGenericWorker);
        }

        let limits = &config.limits;
        if limits.max_handoffs_per_conversation == 0 {
            return Err(ConfigError::InvalidMaxHandoffs(
                limits.max_handoffs_per_conversation,
            ));
        }
        if limits.max_context_bytes == 0 {
            return Err(ConfigError::InvalidMaxContextBytes(limits.max_context_bytes));
        }
        if limits.hard_error_multiplier < 1.0 {
            return Err(ConfigError::InvalidHardErrorMultiplier(
                limits.hard_error_multiplier,
            ));
        }

        if config.timeouts.handoff_secs == 0 {
            return Err(ConfigError::InvalidHandoffTimeout(
                config.timeouts.handoff_secs,
            ));
        }

        if config.jobs.max_attempts == 0 {
            return Err(ConfigError::InvalidJobAttempts(config.jobs.max_attempts));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

//! Validation verdict returned by the handoff validator.
//!
//! Verdicts are data, never errors: every failing check contributes one
//! entry instead of short-circuiting, so callers see the full picture.

use serde::{Deserialize, Serialize};

/// Accumulated outcome of the validation checks for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Check failures, in check order. Empty means the request is valid.
    pub errors: Vec<String>,
    /// Non-fatal findings, in check order.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// A verdict with no findings.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Whether the request passed every check. Holds by construction:
    /// valid iff no errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a check failure.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    /// Record a non-fatal finding.
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// All errors joined into one human-readable line.
    pub fn error_summary(&self) -> String {
        self.errors.join("; ")
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "valid ({} warnings)", self.warnings.len())
        } else {
            write!(f, "invalid: {}", self.error_summary())
        }
    }
}

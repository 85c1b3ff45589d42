//! Handoff request validation.
//!
//! Seven independent checks, run in order, with no short-circuit: every
//! failing check contributes its own entry so callers see the complete
//! verdict. Validation is pure aside from registry and history reads and
//! never mutates state.

use crate::domain::models::{
    HandoffRecord, HandoffRequest, LimitsConfig, PermissionsConfig, ValidationResult,
};
use crate::services::registry::WorkerRegistry;

/// Validates handoff requests against policy, registry state, and
/// conversation history.
pub struct HandoffValidator {
    permissions: PermissionsConfig,
    limits: LimitsConfig,
}

impl HandoffValidator {
    pub fn new(permissions: PermissionsConfig, limits: LimitsConfig) -> Self {
        Self {
            permissions,
            limits,
        }
    }

    /// Run every check against the request. `history` is the conversation's
    /// handoff history, oldest first.
    pub fn validate(
        &self,
        request: &HandoffRequest,
        registry: &WorkerRegistry,
        history: &[HandoffRecord],
    ) -> ValidationResult {
        let mut result = ValidationResult::ok();

        self.check_permission(request, &mut result);
        self.check_target_exists(request, registry, &mut result);
        self.check_cycles(request, history, &mut result);
        self.check_handoff_ceiling(history, &mut result);
        self.check_capabilities(request, registry, &mut result);
        self.check_payload_size(request, &mut result);
        self.check_fallback_exists(request, registry, &mut result);

        result
    }

    fn check_permission(&self, request: &HandoffRequest, result: &mut ValidationResult) {
        if !self
            .permissions
            .allows(&request.source_worker, &request.target_worker)
        {
            result.add_error(format!(
                "{} is not permitted to hand off to {}",
                request.source_worker, request.target_worker
            ));
        }
    }

    fn check_target_exists(
        &self,
        request: &HandoffRequest,
        registry: &WorkerRegistry,
        result: &mut ValidationResult,
    ) {
        if !registry.contains(&request.target_worker) {
            result.add_error(format!(
                "target worker {} is not registered",
                request.target_worker
            ));
        }
    }

    fn check_cycles(
        &self,
        request: &HandoffRequest,
        history: &[HandoffRecord],
        result: &mut ValidationResult,
    ) {
        if request.source_worker == request.target_worker {
            result.add_error(format!(
                "cyclic handoff: {} cannot hand off to itself",
                request.source_worker
            ));
            return;
        }

        // Scan the recent window for the exact reverse pair: this request's
        // target->source immediately preceded by source->target means the
        // conversation is bouncing between the same two workers.
        let window_start = history.len().saturating_sub(self.limits.cycle_window);
        let window = &history[window_start..];
        for pair in window.windows(2) {
            if pair[0].source_worker == request.source_worker
                && pair[0].target_worker == request.target_worker
                && pair[1].source_worker == request.target_worker
                && pair[1].target_worker == request.source_worker
            {
                result.add_error(format!(
                    "circular handoff detected between {} and {}",
                    request.source_worker, request.target_worker
                ));
                return;
            }
        }
    }

    fn check_handoff_ceiling(&self, history: &[HandoffRecord], result: &mut ValidationResult) {
        if history.len() >= self.limits.max_handoffs_per_conversation {
            result.add_error(format!(
                "conversation reached the handoff ceiling of {}",
                self.limits.max_handoffs_per_conversation
            ));
        }
    }

    fn check_capabilities(
        &self,
        request: &HandoffRequest,
        registry: &WorkerRegistry,
        result: &mut ValidationResult,
    ) {
        if request.required_capabilities.is_empty() {
            return;
        }
        let target_capabilities = registry.capabilities_of(&request.target_worker);
        for required in &request.required_capabilities {
            if !target_capabilities.contains(required) {
                result.add_error(format!(
                    "target worker {} lacks required capability {}",
                    request.target_worker, required
                ));
            }
        }
    }

    fn check_payload_size(&self, request: &HandoffRequest, result: &mut ValidationResult) {
        let serialized = serde_json::to_string(&request.context).unwrap_or_default();
        let size = serialized.len();
        let soft_limit = self.limits.max_context_bytes;
        if size <= soft_limit {
            return;
        }

        result.add_warning(format!(
            "context payload is {size} bytes, above the soft limit of {soft_limit}"
        ));

        let hard_limit = (soft_limit as f64 * self.limits.hard_error_multiplier) as usize;
        if size > hard_limit {
            result.add_error(format!(
                "context payload is {size} bytes, above the hard limit of {hard_limit}"
            ));
        }
    }

    fn check_fallback_exists(
        &self,
        request: &HandoffRequest,
        registry: &WorkerRegistry,
        result: &mut ValidationResult,
    ) {
        if let Some(fallback) = &request.fallback_worker {
            if !registry.contains(fallback) {
                // Both signals on purpose: warning-only tooling still sees
                // the failure surface as an error.
                result.add_warning(format!("fallback worker {fallback} is not registered"));
                result.add_error(format!("fallback worker {fallback} is not registered"));
            }
        }
    }
}

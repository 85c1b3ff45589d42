//! Port for intent classification strategies.

use async_trait::async_trait;

use crate::domain::models::{DomainMatch, HandoffSuggestion};

/// Strategy interface for turning raw user text into a handoff suggestion.
///
/// The built-in implementation is a deterministic keyword/pattern cascade;
/// the trait exists so a model-backed classifier can replace it without
/// touching the orchestrator.
#[async_trait]
pub trait IntentStrategy: Send + Sync {
    /// Best-matching domain for the text, with confidence in [0, 1].
    async fn classify(&self, text: &str) -> DomainMatch;

    /// Suggest a handoff target for the text, if any tier of the strategy
    /// matches. `current_worker` is the worker presently holding the
    /// conversation.
    async fn suggest(&self, text: &str, current_worker: &str) -> Option<HandoffSuggestion>;
}

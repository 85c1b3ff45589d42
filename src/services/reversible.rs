//! Reversible handoffs.
//!
//! The undo stack is derived from the conversation's handoff history rather
//! than kept separately. Reversal is pre-authorized: it builds a synthetic
//! result without re-running validation.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::{HandoffRequest, HandoffResult};
use crate::domain::ports::{ConversationStore, IdGenerator};

/// Reason phrasing that marks a handoff as likely temporary.
static TEMPORARY_PHRASING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(temporar\w*|quick\w*|brief\w*|assist\w*|help\w*)\b")
        .expect("temporary phrasing pattern compiles")
});

/// Returns control to the previously active worker.
pub struct ReversibleHandoffManager {
    store: Arc<dyn ConversationStore>,
    ids: Arc<dyn IdGenerator>,
    reversal_confidence_ceiling: f64,
}

impl ReversibleHandoffManager {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        ids: Arc<dyn IdGenerator>,
        reversal_confidence_ceiling: f64,
    ) -> Self {
        Self {
            store,
            ids,
            reversal_confidence_ceiling,
        }
    }

    /// Whether the conversation has enough history to reverse.
    pub async fn can_reverse(&self, conversation_id: &str) -> Result<bool> {
        let history = self.store.history(conversation_id).await?;
        Ok(history.len() > 1)
    }

    /// Worker that held the conversation before the current one: the source
    /// of the second-to-last history entry.
    pub async fn previous_worker(&self, conversation_id: &str) -> Result<Option<String>> {
        let history = self.store.history(conversation_id).await?;
        if history.len() < 2 {
            return Ok(None);
        }
        Ok(Some(history[history.len() - 2].source_worker.clone()))
    }

    /// Build a synthetic handoff result returning control to the previous
    /// worker. Reversal is considered pre-authorized and skips validation.
    /// `None` when the conversation has nothing to reverse.
    pub async fn reverse_last(
        &self,
        conversation_id: &str,
        _current_worker: &str,
        context: HashMap<String, serde_json::Value>,
    ) -> Result<Option<HandoffResult>> {
        let Some(previous) = self.previous_worker(conversation_id).await? else {
            return Ok(None);
        };

        let handoff_id = format!("handoff-{}", self.ids.generate());
        let trace_id = format!("trace-{}", self.ids.generate());
        Ok(Some(HandoffResult::success(
            handoff_id, previous, context, trace_id,
        )))
    }

    /// Whether a handoff should be treated as undoable: its stated reason
    /// signals temporary assistance, or the suggestion that produced it was
    /// below the confidence ceiling.
    pub fn should_be_reversible(
        &self,
        request: &HandoffRequest,
        suggestion_confidence: Option<f64>,
    ) -> bool {
        if let Some(reason) = &request.reason {
            if TEMPORARY_PHRASING.is_match(&reason.to_lowercase()) {
                return true;
            }
        }
        matches!(
            suggestion_confidence,
            Some(confidence) if confidence < self.reversal_confidence_ceiling
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryConversationStore;
    use crate::adapters::system::UuidGenerator;
    use crate::domain::models::HandoffRecord;
    use chrono::Utc;

    fn manager(store: Arc<MemoryConversationStore>) -> ReversibleHandoffManager {
        ReversibleHandoffManager::new(store, Arc::new(UuidGenerator), 0.6)
    }

    async fn seed(store: &MemoryConversationStore, hops: &[(&str, &str)]) {
        for (i, (source, target)) in hops.iter().enumerate() {
            store
                .append_handoff(
                    "conv-1",
                    HandoffRecord::new(*source, *target, Utc::now(), format!("h-{i}")),
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_cannot_reverse_short_history() {
        let store = Arc::new(MemoryConversationStore::new());
        let manager = manager(store.clone());

        assert!(!manager.can_reverse("conv-1").await.unwrap());

        seed(&store, &[("triage", "math-tutor")]).await;
        assert!(!manager.can_reverse("conv-1").await.unwrap());
        assert!(manager.previous_worker("conv-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_previous_worker_is_second_to_last_source() {
        let store = Arc::new(MemoryConversationStore::new());
        seed(&store, &[("triage", "math-tutor"), ("math-tutor", "historian")]).await;
        let manager = manager(store);

        assert!(manager.can_reverse("conv-1").await.unwrap());
        assert_eq!(
            manager.previous_worker("conv-1").await.unwrap().as_deref(),
            Some("triage")
        );
    }

    #[tokio::test]
    async fn test_reverse_last_builds_synthetic_result() {
        let store = Arc::new(MemoryConversationStore::new());
        seed(&store, &[("triage", "math-tutor"), ("math-tutor", "historian")]).await;
        let manager = manager(store);

        let mut context = HashMap::new();
        context.insert("topic".to_string(), serde_json::json!("fractions"));

        let result = manager
            .reverse_last("conv-1", "historian", context)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_success());
        assert_eq!(result.target_worker, "triage");
        assert_eq!(result.context["topic"], "fractions");
    }

    #[tokio::test]
    async fn test_reverse_last_on_empty_history() {
        let store = Arc::new(MemoryConversationStore::new());
        let manager = manager(store);

        let result = manager
            .reverse_last("conv-1", "triage", HashMap::new())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_should_be_reversible_by_reason() {
        let store = Arc::new(MemoryConversationStore::new());
        let manager = manager(store);

        for reason in [
            "temporary consult",
            "quick question for the specialist",
            "briefly checking a date",
            "needs assistance",
            "please help with this",
        ] {
            let request =
                HandoffRequest::new("triage", "math-tutor", "conv-1").with_reason(reason);
            assert!(
                manager.should_be_reversible(&request, None),
                "expected reversible for reason {reason:?}"
            );
        }

        let request = HandoffRequest::new("triage", "math-tutor", "conv-1")
            .with_reason("permanent transfer to billing");
        assert!(!manager.should_be_reversible(&request, None));
    }

    #[tokio::test]
    async fn test_should_be_reversible_by_low_confidence() {
        let store = Arc::new(MemoryConversationStore::new());
        let manager = manager(store);
        let request = HandoffRequest::new("triage", "math-tutor", "conv-1");

        assert!(manager.should_be_reversible(&request, Some(0.4)));
        assert!(!manager.should_be_reversible(&request, Some(0.6)));
        assert!(!manager.should_be_reversible(&request, Some(0.9)));
        assert!(!manager.should_be_reversible(&request, None));
    }
}

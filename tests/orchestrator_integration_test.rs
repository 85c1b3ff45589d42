//! End-to-end orchestration scenarios over the fully wired engine.

mod common;

use common::{default_workers, harness, harness_with};
use switchboard::domain::models::{Config, HandoffStatus, LimitsConfig};
use switchboard::{ConversationStore, HandoffRequest};

#[tokio::test]
async fn test_full_handoff_pipeline() {
    let h = harness();

    let request = HandoffRequest::new("generalist", "math-tutor", "conv-1")
        .with_reason("user needs arithmetic")
        .with_required_capabilities(["mathematics"])
        .with_context_entry("topic", serde_json::json!("percentages"));

    let result = h.orchestrator.handle(request).await;
    assert_eq!(result.status, HandoffStatus::Success);
    assert_eq!(result.target_worker, "math-tutor");
    assert!(!result.trace_id.is_empty());

    // History and context were persisted.
    let history = h.store.history("conv-1").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].source_worker, "generalist");
    let context = h.store.load_context("conv-1").await.unwrap();
    assert_eq!(context["topic"], "percentages");

    // The trace covers every pipeline stage.
    let kinds = h.sink.kinds();
    for expected in [
        "handoff_started",
        "validation_completed",
        "span_started",
        "span_ended",
        "handoff_succeeded",
    ] {
        assert!(kinds.contains(&expected), "missing event {expected}");
    }
}

#[tokio::test]
async fn test_validation_rejection_carries_all_errors() {
    let h = harness();

    // Unknown target, missing capability on it, and a ghost fallback.
    let request = HandoffRequest::new("generalist", "plumber", "conv-1")
        .with_required_capabilities(["plumbing"])
        .with_fallback_worker("ghost");

    let verdict = h.orchestrator.validate_request(&request).await;
    assert!(!verdict.is_valid());
    assert!(verdict.errors.len() >= 3);
    assert_eq!(verdict.warnings.len(), 1);

    let result = h.orchestrator.handle(request).await;
    assert_eq!(result.status, HandoffStatus::Failed);
}

#[tokio::test]
async fn test_handoff_ceiling_closes_conversation() {
    let config = Config {
        limits: LimitsConfig {
            max_handoffs_per_conversation: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    let h = harness_with(config, default_workers());

    assert!(h
        .orchestrator
        .handle(HandoffRequest::new("generalist", "math-tutor", "conv-1"))
        .await
        .is_success());
    assert!(h
        .orchestrator
        .handle(HandoffRequest::new("math-tutor", "historian", "conv-1"))
        .await
        .is_success());

    // At the ceiling: everything is rejected, whatever the fields.
    let result = h
        .orchestrator
        .handle(HandoffRequest::new("historian", "scientist", "conv-1"))
        .await;
    assert_eq!(result.status, HandoffStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("ceiling"));

    // A different conversation is unaffected.
    assert!(h
        .orchestrator
        .handle(HandoffRequest::new("generalist", "math-tutor", "conv-2"))
        .await
        .is_success());
}

#[tokio::test]
async fn test_permission_graph_is_an_allowlist() {
    let mut config = Config::default();
    config
        .permissions
        .graph
        .insert("generalist".to_string(), vec!["historian".to_string()]);
    let h = harness_with(config, default_workers());

    // The denied edge is rejected at validation, as data.
    let result = h
        .orchestrator
        .handle(HandoffRequest::new("generalist", "math-tutor", "conv-1"))
        .await;
    assert_eq!(result.status, HandoffStatus::Failed);
    assert!(result.error.as_deref().unwrap().contains("not permitted"));

    // The permitted edge still works, and workers without an entry in the
    // graph may target anyone.
    assert!(h
        .orchestrator
        .handle(HandoffRequest::new("generalist", "historian", "conv-1"))
        .await
        .is_success());
    assert!(h
        .orchestrator
        .handle(HandoffRequest::new("historian", "math-tutor", "conv-1"))
        .await
        .is_success());
}

#[tokio::test]
async fn test_intelligent_and_hybrid_paths() {
    let h = harness();

    // Strong mathematics intent routes to the specialist.
    let result = h
        .orchestrator
        .handle_intelligent_handoff(
            "calculate the math equation for me",
            "generalist",
            "conv-1",
            None,
        )
        .await
        .unwrap();
    assert_eq!(result.target_worker, "math-tutor");

    // No signal: the hybrid path defers to the caller instead of forcing
    // a manual strategy.
    assert!(h
        .orchestrator
        .handle_hybrid_handoff("good morning", "generalist", "conv-2")
        .await
        .is_none());
}

#[tokio::test]
async fn test_reversal_returns_to_previous_worker() {
    let h = harness();

    h.orchestrator
        .handle(HandoffRequest::new("generalist", "math-tutor", "conv-1"))
        .await;
    h.orchestrator
        .handle(HandoffRequest::new("math-tutor", "historian", "conv-1"))
        .await;

    assert!(h.reversible.can_reverse("conv-1").await.unwrap());
    assert_eq!(
        h.reversible.previous_worker("conv-1").await.unwrap().as_deref(),
        Some("generalist")
    );

    let context = h.store.load_context("conv-1").await.unwrap();
    let reversal = h
        .reversible
        .reverse_last("conv-1", "historian", context)
        .await
        .unwrap()
        .unwrap();
    assert!(reversal.is_success());
    assert_eq!(reversal.target_worker, "generalist");
}

#[tokio::test]
async fn test_reversibility_signals() {
    let h = harness();

    let quick = HandoffRequest::new("generalist", "math-tutor", "conv-1")
        .with_reason("quick check with the tutor");
    assert!(h.reversible.should_be_reversible(&quick, None));

    let suggestion = h
        .orchestrator
        .suggest_handoff("that was quite a century", "generalist")
        .await
        .unwrap();
    // Weak suggestions are flagged as reversible handoffs.
    let request = HandoffRequest::new("generalist", "historian", "conv-1");
    assert!(h
        .reversible
        .should_be_reversible(&request, Some(suggestion.confidence)));
}

#[tokio::test]
async fn test_failure_paths_always_emit_metrics() {
    let h = harness();

    let request = HandoffRequest::new("generalist", "generalist", "conv-1");
    let result = h.orchestrator.handle(request).await;
    assert_eq!(result.status, HandoffStatus::Failed);

    let kinds = h.sink.kinds();
    assert!(kinds.contains(&"handoff_failed"));
    assert!(kinds.contains(&"validation_completed"));
}

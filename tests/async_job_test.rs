//! Deferred handoff jobs over the fully wired engine.

mod common;

use common::harness;
use std::time::Duration;
use switchboard::domain::models::{JobState, JobStep};
use switchboard::{ConversationStore, HandoffRequest, JobOptions};

async fn wait_for_terminal(
    h: &common::Harness,
    job_id: &str,
) -> switchboard::JobStatus {
    for _ in 0..200 {
        if let Some(status) = h.async_manager.status(job_id).await {
            if status.state.is_terminal() {
                return status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not reach a terminal state");
}

#[tokio::test]
async fn test_deferred_handoff_completes_off_caller_path() {
    let h = harness();
    let request = HandoffRequest::new("generalist", "math-tutor", "conv-1");
    let job_id = h.async_manager.submit(request, JobOptions::default()).await;

    let status = wait_for_terminal(&h, &job_id).await;
    assert_eq!(status.state, JobState::Completed);
    assert_eq!(status.progress, 100);
    assert_eq!(status.current_step, Some(JobStep::Finalize));

    let result = status.result.unwrap();
    assert!(result.is_success());
    assert_eq!(result.target_worker, "math-tutor");

    // The deferred execution persisted conversation state.
    assert_eq!(h.store.history("conv-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_job_fails_with_stored_error() {
    let h = harness();
    let request = HandoffRequest::new("generalist", "plumber", "conv-1");
    let job_id = h
        .async_manager
        .submit(request, JobOptions::default().with_max_attempts(2))
        .await;

    let status = wait_for_terminal(&h, &job_id).await;
    assert_eq!(status.state, JobState::Failed);
    assert!(status.error.as_deref().unwrap().contains("not registered"));
}

#[tokio::test]
async fn test_status_polling_is_non_blocking_for_unknown_ids() {
    let h = harness();
    assert!(h.async_manager.status("job-nope").await.is_none());
    assert!(!h.async_manager.cancel("job-nope").await);
}

#[tokio::test]
async fn test_job_state_changes_are_observable() {
    let h = harness();
    let request = HandoffRequest::new("generalist", "math-tutor", "conv-1");
    let job_id = h.async_manager.submit(request, JobOptions::default()).await;
    wait_for_terminal(&h, &job_id).await;

    let states: Vec<String> = h
        .sink
        .events()
        .iter()
        .filter_map(|envelope| match &envelope.event {
            switchboard::domain::models::HandoffEvent::JobStateChanged { state, .. } => {
                Some(state.clone())
            }
            _ => None,
        })
        .collect();

    assert_eq!(states.first().map(String::as_str), Some("pending"));
    assert_eq!(states.last().map(String::as_str), Some("completed"));
    assert!(states.iter().any(|s| s == "processing"));
}

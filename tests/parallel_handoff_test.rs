//! Multi-domain fan-out over the fully wired engine.

mod common;

use common::{harness, harness_with, StubWorker};
use std::time::Duration;
use switchboard::domain::models::{BatchStatus, Config, OutcomeStatus};

const MULTI_DOMAIN_QUERY: &str = "Calculate 15% of 200 and tell me about Napoleon";

#[tokio::test]
async fn test_analyze_detects_both_domains() {
    let h = harness();
    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].target_worker, "math-tutor");
    assert_eq!(requests[1].target_worker, "historian");
}

#[tokio::test]
async fn test_fanout_merges_specialist_responses() {
    let h = harness();
    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");
    let result = h.parallel.execute(&requests, "conv-1").await;

    assert_eq!(result.status, BatchStatus::AllSucceeded);
    assert_eq!(result.outcomes.len(), 2);

    let merged = result.merged_response.unwrap();
    assert!(merged.contains("### math-tutor"));
    assert!(merged.contains("### historian"));
    assert!(merged.contains("Combined 2 specialist responses"));
}

#[tokio::test]
async fn test_failed_worker_does_not_abort_batch() {
    let h = harness_with(
        Config::default(),
        vec![
            StubWorker::echo("generalist", &["general"]),
            StubWorker::echo("math-tutor", &["mathematics"]),
            StubWorker::failing("historian", &["history"]),
        ],
    );

    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");
    let result = h.parallel.execute(&requests, "conv-1").await;

    // One outcome per request even though a worker failed.
    assert_eq!(result.outcomes.len(), requests.len());
    assert_eq!(result.status, BatchStatus::PartialSuccess);
    assert!(result.outcome_for("math-tutor").unwrap().is_success());

    let failed = result.outcome_for("historian").unwrap();
    assert_eq!(failed.status, OutcomeStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("provider"));

    // The merge still attributes the surviving response.
    let merged = result.merged_response.unwrap();
    assert!(merged.starts_with("[math-tutor]"));
}

#[tokio::test]
async fn test_slow_worker_is_timed_out_not_awaited() {
    let config = Config {
        timeouts: switchboard::domain::models::TimeoutConfig {
            worker_call_secs: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let h = harness_with(
        config,
        vec![
            StubWorker::echo("generalist", &["general"]),
            StubWorker::echo("math-tutor", &["mathematics"]),
            StubWorker::slow("historian", &["history"], Duration::from_secs(30)),
        ],
    );

    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");

    let started = std::time::Instant::now();
    let result = h.parallel.execute(&requests, "conv-1").await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(
        result.outcome_for("historian").unwrap().status,
        OutcomeStatus::TimedOut
    );
    assert!(result.outcome_for("math-tutor").unwrap().is_success());
}

#[tokio::test]
async fn test_all_failures_produce_fixed_message() {
    let h = harness_with(
        Config::default(),
        vec![
            StubWorker::echo("generalist", &["general"]),
            StubWorker::failing("math-tutor", &["mathematics"]),
            StubWorker::failing("historian", &["history"]),
        ],
    );

    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");
    let result = h.parallel.execute(&requests, "conv-1").await;

    assert_eq!(result.status, BatchStatus::AllFailed);
    assert!(result
        .merged_response
        .unwrap()
        .contains("could not be processed"));
}

#[tokio::test]
async fn test_single_domain_input_is_not_fanned_out() {
    let h = harness();
    assert!(h
        .parallel
        .analyze("calculate 15% of 200", "generalist", "conv-1")
        .is_empty());
}

#[tokio::test]
async fn test_batch_completion_is_observable() {
    let h = harness();
    let requests = h.parallel.analyze(MULTI_DOMAIN_QUERY, "generalist", "conv-1");
    h.parallel.execute(&requests, "conv-1").await;

    assert!(h.sink.kinds().contains(&"parallel_batch_completed"));
}

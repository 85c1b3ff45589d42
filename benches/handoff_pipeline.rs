//! Benchmarks for the validation and classification hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use switchboard::domain::models::{LimitsConfig, PermissionsConfig, RoutingConfig};
use switchboard::services::{HandoffValidator, KeywordClassifier, WorkerRegistry};
use switchboard::{ChatWorker, HandoffError, HandoffRequest};

struct BenchWorker {
    id: String,
    capabilities: Vec<String>,
}

#[async_trait::async_trait]
impl ChatWorker for BenchWorker {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> Vec<String> {
        self.capabilities.clone()
    }

    async fn chat(&self, _input: &str) -> Result<String, HandoffError> {
        Ok(String::new())
    }
}

fn registry() -> WorkerRegistry {
    let mut registry = WorkerRegistry::new();
    for (id, caps) in [
        ("generalist", vec!["general"]),
        ("math-tutor", vec!["mathematics"]),
        ("historian", vec!["history"]),
        ("scientist", vec!["science"]),
        ("coder", vec!["programming"]),
        ("travel-agent", vec!["travel"]),
    ] {
        registry.register(Arc::new(BenchWorker {
            id: id.to_string(),
            capabilities: caps.into_iter().map(ToString::to_string).collect(),
        }));
    }
    registry
}

fn bench_validation(c: &mut Criterion) {
    let registry = registry();
    let validator = HandoffValidator::new(PermissionsConfig::default(), LimitsConfig::default());
    let request = HandoffRequest::new("generalist", "math-tutor", "conv-bench")
        .with_required_capabilities(["mathematics"])
        .with_context_entry("topic", serde_json::json!("percentages"));

    c.bench_function("validate_request", |b| {
        b.iter(|| black_box(validator.validate(black_box(&request), &registry, &[])));
    });
}

fn bench_classification(c: &mut Criterion) {
    let classifier = KeywordClassifier::with_default_detectors(RoutingConfig::default());
    let query = "Calculate 15% of 200 and tell me about Napoleon";

    c.bench_function("detect_domains", |b| {
        b.iter(|| black_box(classifier.detect_all(black_box(query))));
    });
}

fn bench_capability_lookup(c: &mut Criterion) {
    let registry = registry();
    let capabilities = vec!["mathematics".to_string()];

    c.bench_function("find_by_capabilities", |b| {
        b.iter(|| black_box(registry.find_by_capabilities(black_box(&capabilities))));
    });
}

criterion_group!(
    benches,
    bench_validation,
    bench_classification,
    bench_capability_lookup
);
criterion_main!(benches);

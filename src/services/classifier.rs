//! Heuristic intent classification.
//!
//! A deterministic keyword/pattern cascade over normalized lowercase text.
//! Each domain detector scores independently as a weighted sum of
//! sub-signals capped at 1.0; suggestion selection runs a strict four-tier
//! cascade where later tiers never override earlier ones.

use async_trait::async_trait;
use regex::Regex;
use std::collections::HashMap;

use crate::domain::models::{DomainMatch, HandoffSuggestion, RoutingConfig, SuggestionTier};
use crate::domain::ports::IntentStrategy;

/// Domain tag used when no detector fires.
pub const GENERAL_DOMAIN: &str = "general";

struct WeightedSignal {
    /// Original keyword or pattern text, reported back in matches
    label: String,
    pattern: Regex,
    weight: f64,
}

/// Scores one domain over normalized input text.
pub struct DomainDetector {
    domain: String,
    signals: Vec<WeightedSignal>,
}

impl DomainDetector {
    /// Create a detector with no signals.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            signals: Vec::new(),
        }
    }

    /// The domain this detector scores.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Add a whole-word keyword signal.
    ///
    /// # Panics
    /// Panics if the keyword cannot be compiled into a word-boundary
    /// pattern, which only happens for empty keywords.
    pub fn with_keyword(mut self, keyword: &str, weight: f64) -> Self {
        let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(keyword)))
            .expect("escaped keyword compiles");
        self.signals.push(WeightedSignal {
            label: keyword.to_string(),
            pattern,
            weight,
        });
        self
    }

    /// Add a regex signal.
    ///
    /// # Panics
    /// Panics if the pattern is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str, weight: f64) -> Self {
        let compiled = Regex::new(pattern).expect("detector pattern compiles");
        self.signals.push(WeightedSignal {
            label: pattern.to_string(),
            pattern: compiled,
            weight,
        });
        self
    }

    /// Score the detector against normalized text. `None` when no
    /// sub-signal matches; otherwise the weighted sum capped at 1.0.
    pub fn evaluate(&self, normalized: &str) -> Option<DomainMatch> {
        let mut score = 0.0;
        let mut matched = Vec::new();
        for signal in &self.signals {
            if signal.pattern.is_match(normalized) {
                score += signal.weight;
                matched.push(signal.label.clone());
            }
        }
        if matched.is_empty() {
            None
        } else {
            Some(DomainMatch::new(&self.domain, score, matched))
        }
    }
}

/// A named-concept pattern for the last-resort suggestion tier.
pub struct ConceptPattern {
    domain: String,
    concept: String,
    pattern: Regex,
}

impl ConceptPattern {
    /// Create a concept pattern.
    ///
    /// # Panics
    /// Panics if the pattern is not a valid regex.
    pub fn new(domain: impl Into<String>, concept: impl Into<String>, pattern: &str) -> Self {
        Self {
            domain: domain.into(),
            concept: concept.into(),
            pattern: Regex::new(pattern).expect("concept pattern compiles"),
        }
    }
}

/// Deterministic keyword/pattern classifier.
///
/// Domain detectors are evaluated in registration order; ties on confidence
/// resolve to the earlier detector. The domain -> worker mapping tells the
/// suggestion cascade which specialist serves each domain.
pub struct KeywordClassifier {
    detectors: Vec<DomainDetector>,
    concept_patterns: Vec<ConceptPattern>,
    domain_workers: HashMap<String, String>,
    routing: RoutingConfig,
}

impl KeywordClassifier {
    /// Create a classifier with no detectors.
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            detectors: Vec::new(),
            concept_patterns: Vec::new(),
            domain_workers: HashMap::new(),
            routing,
        }
    }

    /// Create a classifier with the built-in detector set.
    pub fn with_default_detectors(routing: RoutingConfig) -> Self {
        let mut classifier = Self::new(routing);
        for detector in default_detectors() {
            classifier = classifier.with_detector(detector);
        }
        for concept in default_concept_patterns() {
            classifier = classifier.with_concept_pattern(concept);
        }
        classifier
    }

    /// Append a domain detector. Order matters: earlier detectors win ties.
    pub fn with_detector(mut self, detector: DomainDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Append a last-resort concept pattern.
    pub fn with_concept_pattern(mut self, concept: ConceptPattern) -> Self {
        self.concept_patterns.push(concept);
        self
    }

    /// Map a domain to the worker that serves it.
    pub fn with_domain_worker(
        mut self,
        domain: impl Into<String>,
        worker: impl Into<String>,
    ) -> Self {
        self.domain_workers.insert(domain.into(), worker.into());
        self
    }

    /// Worker serving a domain, if one is mapped.
    pub fn worker_for_domain(&self, domain: &str) -> Option<&str> {
        self.domain_workers.get(domain).map(String::as_str)
    }

    /// Evaluate every detector with no early exit, in registration order.
    pub fn detect_all(&self, text: &str) -> Vec<DomainMatch> {
        let normalized = normalize(text);
        self.detectors
            .iter()
            .filter_map(|d| d.evaluate(&normalized))
            .collect()
    }

    fn best_match(&self, fired: &[DomainMatch]) -> Option<DomainMatch> {
        // First detector wins ties, so registration order stays meaningful.
        let mut best: Option<&DomainMatch> = None;
        for candidate in fired {
            match best {
                Some(current) if candidate.confidence <= current.confidence => {}
                _ => best = Some(candidate),
            }
        }
        best.cloned()
    }

    fn concept_suggestion(&self, normalized: &str, current_worker: &str) -> Option<HandoffSuggestion> {
        for concept in &self.concept_patterns {
            if !concept.pattern.is_match(normalized) {
                continue;
            }
            let Some(worker) = self.worker_for_domain(&concept.domain) else {
                continue;
            };
            if worker == current_worker {
                continue;
            }
            return Some(
                HandoffSuggestion::new(
                    worker,
                    self.routing.pattern_confidence,
                    format!("input mentions {}", concept.concept),
                    SuggestionTier::SpecificPattern,
                )
                .with_required_capabilities([concept.domain.clone()]),
            );
        }
        None
    }
}

#[async_trait]
impl IntentStrategy for KeywordClassifier {
    async fn classify(&self, text: &str) -> DomainMatch {
        let fired = self.detect_all(text);
        self.best_match(&fired)
            .unwrap_or_else(|| DomainMatch::new(GENERAL_DOMAIN, 0.0, Vec::<String>::new()))
    }

    async fn suggest(&self, text: &str, current_worker: &str) -> Option<HandoffSuggestion> {
        let fired = self.detect_all(text);

        // Tier 1: more than one domain fired -> ambiguous, point at the
        // generic worker with fixed low confidence.
        if fired.len() > 1 {
            let domains: Vec<&str> = fired.iter().map(|m| m.domain.as_str()).collect();
            return Some(HandoffSuggestion::new(
                &self.routing.generic_worker,
                self.routing.ambiguous_confidence,
                format!("input spans multiple domains: {}", domains.join(", ")),
                SuggestionTier::Ambiguous,
            ));
        }

        if let Some(best) = self.best_match(&fired) {
            // Tier 2: general or weak match -> generic worker.
            if best.domain == GENERAL_DOMAIN || best.confidence < self.routing.confidence_floor {
                return Some(HandoffSuggestion::new(
                    &self.routing.generic_worker,
                    best.confidence,
                    format!("weak {} signal", best.domain),
                    SuggestionTier::Generic,
                ));
            }

            // Tier 3: a specialist other than the current worker.
            match self.worker_for_domain(&best.domain) {
                Some(worker) if worker != current_worker => {
                    let worker = worker.to_string();
                    return Some(
                        HandoffSuggestion::new(
                            worker,
                            best.confidence + self.routing.suggestion_bonus,
                            format!(
                                "detected {} intent ({})",
                                best.domain,
                                best.keywords.join(", ")
                            ),
                            SuggestionTier::CrossWorker,
                        )
                        .with_required_capabilities([best.domain.clone()]),
                    );
                }
                Some(_) => {
                    // Current worker already serves this domain; only the
                    // last-resort tier below may still produce a target.
                }
                None => {
                    // No specialist registered for the domain.
                    return Some(HandoffSuggestion::new(
                        &self.routing.generic_worker,
                        best.confidence,
                        format!("no specialist registered for {}", best.domain),
                        SuggestionTier::Generic,
                    ));
                }
            }
        }

        // Tier 4: last resort, direct mention of a named concept.
        self.concept_suggestion(&normalize(text), current_worker)
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn default_detectors() -> Vec<DomainDetector> {
    vec![
        DomainDetector::new("mathematics")
            .with_keyword("calculate", 0.4)
            .with_keyword("equation", 0.4)
            .with_keyword("math", 0.5)
            .with_keyword("solve", 0.3)
            .with_keyword("multiply", 0.3)
            .with_keyword("divide", 0.3)
            .with_keyword("percentage", 0.3)
            .with_pattern(r"\d+\s*%", 0.4)
            .with_pattern(r"\d+\s*[-+*/^]\s*\d+", 0.4),
        DomainDetector::new("history")
            .with_keyword("history", 0.5)
            .with_keyword("historical", 0.4)
            .with_keyword("napoleon", 0.5)
            .with_keyword("ancient", 0.3)
            .with_keyword("empire", 0.3)
            .with_keyword("revolution", 0.3)
            .with_keyword("dynasty", 0.3)
            .with_keyword("century", 0.2)
            .with_pattern(r"\b\d{3,4}\s*(bc|bce|ad|ce)\b", 0.4),
        DomainDetector::new("science")
            .with_keyword("science", 0.5)
            .with_keyword("physics", 0.4)
            .with_keyword("chemistry", 0.4)
            .with_keyword("biology", 0.4)
            .with_keyword("quantum", 0.4)
            .with_keyword("molecule", 0.3)
            .with_keyword("experiment", 0.3),
        DomainDetector::new("programming")
            .with_keyword("code", 0.4)
            .with_keyword("compile", 0.4)
            .with_keyword("debug", 0.4)
            .with_keyword("rust", 0.4)
            .with_keyword("python", 0.4)
            .with_keyword("function", 0.3)
            .with_keyword("bug", 0.3)
            .with_pattern(r"\bfn\s+\w+|\bdef\s+\w+", 0.4),
        DomainDetector::new("travel")
            .with_keyword("travel", 0.5)
            .with_keyword("flight", 0.4)
            .with_keyword("hotel", 0.4)
            .with_keyword("itinerary", 0.4)
            .with_keyword("destination", 0.3)
            .with_keyword("visa", 0.3)
            .with_keyword("trip", 0.3),
    ]
}

fn default_concept_patterns() -> Vec<ConceptPattern> {
    vec![
        ConceptPattern::new(
            "mathematics",
            "a named theorem",
            r"\bpythagorean theorem\b|\bfibonacci\b|\bprime numbers?\b",
        ),
        ConceptPattern::new(
            "history",
            "a named historical document or battle",
            r"\bmagna carta\b|\bwaterloo\b|\btreaty of \w+\b",
        ),
        ConceptPattern::new(
            "science",
            "a named scientific process",
            r"\bphotosynthesis\b|\bnatural selection\b|\brelativity\b",
        ),
        ConceptPattern::new(
            "programming",
            "a language-specific concept",
            r"\bborrow checker\b|\bgarbage collector\b|\bstack trace\b",
        ),
        ConceptPattern::new(
            "travel",
            "a named landmark",
            r"\bmachu picchu\b|\beiffel tower\b|\bgreat wall\b",
        ),
    ]
}

//! Intent classification output types.

use serde::{Deserialize, Serialize};

use super::handoff::HandoffRequest;

/// Which tier of the suggestion cascade produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionTier {
    /// More than one domain detector fired
    Ambiguous,
    /// Best match was the general domain or below the confidence floor
    Generic,
    /// A specialist worker other than the current one matched
    CrossWorker,
    /// A specific named-concept pattern matched
    SpecificPattern,
}

impl SuggestionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambiguous => "ambiguous",
            Self::Generic => "generic",
            Self::CrossWorker => "cross_worker",
            Self::SpecificPattern => "specific_pattern",
        }
    }
}

/// Result of running the domain detectors over one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainMatch {
    /// Detected domain tag
    pub domain: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Keywords that contributed to the score
    pub keywords: Vec<String>,
}

impl DomainMatch {
    /// Create a match, clamping confidence into [0, 1].
    pub fn new<I, S>(domain: impl Into<String>, confidence: f64, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain: domain.into(),
            confidence: confidence.clamp(0.0, 1.0),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

/// A recommendation to hand the conversation to another worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffSuggestion {
    /// Recommended target worker
    pub target_worker: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Why this worker was suggested
    pub reason: String,
    /// Priority hint for the derived request
    pub priority: u32,
    /// Capabilities the derived request should require
    pub required_capabilities: Vec<String>,
    /// Cascade tier that produced this suggestion
    pub tier: SuggestionTier,
}

impl HandoffSuggestion {
    /// Create a suggestion, clamping confidence into [0, 1].
    pub fn new(
        target_worker: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        tier: SuggestionTier,
    ) -> Self {
        Self {
            target_worker: target_worker.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reason: reason.into(),
            priority: 1,
            required_capabilities: Vec::new(),
            tier,
        }
    }

    /// Set the priority hint. Clamped to a minimum of 1.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority.max(1);
        self
    }

    /// Set the required capabilities.
    pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    /// Convert into a concrete handoff request.
    pub fn into_request(
        self,
        source_worker: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> HandoffRequest {
        HandoffRequest::new(source_worker, self.target_worker, conversation_id)
            .with_reason(self.reason)
            .with_priority(self.priority)
            .with_required_capabilities(self.required_capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_clamped() {
        let high = HandoffSuggestion::new("w", 1.7, "r", SuggestionTier::CrossWorker);
        assert_eq!(high.confidence, 1.0);

        let low = HandoffSuggestion::new("w", -0.3, "r", SuggestionTier::Generic);
        assert_eq!(low.confidence, 0.0);

        let m = DomainMatch::new("mathematics", 2.5, ["calculate"]);
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn test_into_request() {
        let request = HandoffSuggestion::new("math-tutor", 0.8, "arithmetic", SuggestionTier::CrossWorker)
            .with_priority(2)
            .with_required_capabilities(["mathematics"])
            .into_request("triage", "conv-1");

        assert_eq!(request.source_worker, "triage");
        assert_eq!(request.target_worker, "math-tutor");
        assert_eq!(request.conversation_id, "conv-1");
        assert_eq!(request.reason.as_deref(), Some("arithmetic"));
        assert_eq!(request.priority, 2);
        assert_eq!(request.required_capabilities, vec!["mathematics"]);
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(SuggestionTier::Ambiguous.as_str(), "ambiguous");
        assert_eq!(SuggestionTier::SpecificPattern.as_str(), "specific_pattern");
    }
}

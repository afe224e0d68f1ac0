//! Routing decision after generation

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::confidence::{ConfidenceWeights, EvidenceFlags};
use super::scope::{OutOfScopeDetector, ScopeVerdict};
use super::DecisionConfig;

/// Next step for the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Terminal persona step: the answer goes back to the user
    Personality,
    /// Hand the conversation to the escalation path
    Escalate,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Personality => write!(f, "personality"),
            Route::Escalate => write!(f, "escalate"),
        }
    }
}

/// Decision state machine:
/// `GenerationPending -> InScope | OutOfScope -> Routed`
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffState {
    GenerationPending,
    InScope,
    OutOfScope { phrase: String },
    Routed(Route),
}

impl HandoffState {
    /// Classify the generated answer
    pub fn observe(self, verdict: ScopeVerdict) -> HandoffState {
        match (self, verdict) {
            (HandoffState::GenerationPending, ScopeVerdict::InScope) => HandoffState::InScope,
            (HandoffState::GenerationPending, ScopeVerdict::OutOfScope { phrase }) => {
                HandoffState::OutOfScope { phrase }
            }
            (state, _) => state,
        }
    }

    /// Pick the route. Out of scope always ends at the persona step;
    /// otherwise confidence strictly below the threshold escalates.
    pub fn route(self, confidence: f64, threshold: f64) -> HandoffState {
        match self {
            HandoffState::OutOfScope { .. } => HandoffState::Routed(Route::Personality),
            HandoffState::InScope | HandoffState::GenerationPending => {
                if confidence < threshold {
                    HandoffState::Routed(Route::Escalate)
                } else {
                    HandoffState::Routed(Route::Personality)
                }
            }
            routed @ HandoffState::Routed(_) => routed,
        }
    }

    pub fn final_route(&self) -> Option<Route> {
        match self {
            HandoffState::Routed(route) => Some(*route),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroundingMode {
    SingleSource,
    MultiSource,
    None,
}

impl GroundingMode {
    pub fn from_evidence(evidence: &EvidenceFlags) -> Self {
        match evidence.count() {
            0 => GroundingMode::None,
            1 => GroundingMode::SingleSource,
            _ => GroundingMode::MultiSource,
        }
    }
}

/// Evidence summary returned with every answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingResult {
    pub mode: GroundingMode,
    pub sources: Vec<String>,
    pub confidence: f64,
}

impl GroundingResult {
    pub fn empty() -> Self {
        Self {
            mode: GroundingMode::None,
            sources: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Everything the policy decided for one answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffDecision {
    pub route: Route,
    pub confidence: f64,
    pub threshold: f64,
    pub out_of_scope: bool,
    /// Sources to cite; empty unless attached
    pub sources: Vec<String>,
    pub sources_attached: bool,
    pub mode: GroundingMode,
}

impl HandoffDecision {
    pub fn grounding(&self) -> GroundingResult {
        GroundingResult {
            mode: self.mode,
            sources: self.sources.clone(),
            confidence: self.confidence,
        }
    }

    /// Append a `Sources:` line when sources were attached
    pub fn finalize_answer(&self, answer: &str) -> String {
        if self.sources_attached {
            format!("{}\n\nSources: {}", answer.trim_end(), self.sources.join(", "))
        } else {
            answer.to_string()
        }
    }
}

/// Confidence scoring, scope detection and source selection in one place
#[derive(Debug, Clone)]
pub struct HandoffPolicy {
    weights: ConfidenceWeights,
    threshold: f64,
    max_sources: usize,
    detector: OutOfScopeDetector,
}

impl HandoffPolicy {
    pub fn new(config: &DecisionConfig) -> Self {
        Self {
            weights: config.weights,
            threshold: config.handoff_confidence_threshold,
            max_sources: config.max_sources_cited,
            detector: OutOfScopeDetector::new(config.out_of_scope_phrases.clone()),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn confidence(&self, evidence: &EvidenceFlags) -> f64 {
        self.weights.confidence(evidence)
    }

    /// Sorted, deduplicated and capped
    pub fn select_sources(&self, candidates: &[String]) -> Vec<String> {
        let mut sources: Vec<String> = candidates
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        sources.sort();
        sources.dedup();
        sources.truncate(self.max_sources);
        sources
    }

    /// Decide the route for `answer` given the evidence that built its context
    pub fn decide(&self, answer: &str, evidence: &EvidenceFlags, candidate_sources: &[String]) -> HandoffDecision {
        let confidence = self.confidence(evidence);
        let verdict = self.detector.detect(answer);
        let out_of_scope = verdict.is_out_of_scope();

        let route = HandoffState::GenerationPending
            .observe(verdict)
            .route(confidence, self.threshold)
            .final_route()
            .unwrap_or(Route::Escalate);

        let already_cited = answer.to_lowercase().contains("sources:");
        let sources = if route == Route::Personality && !out_of_scope && !already_cited {
            self.select_sources(candidate_sources)
        } else {
            Vec::new()
        };
        let sources_attached = !sources.is_empty();

        info!(
            "Handoff decision: route={}, confidence={:.2}, threshold={:.2}, oos={}",
            route, confidence, self.threshold, out_of_scope
        );

        HandoffDecision {
            route,
            confidence,
            threshold: self.threshold,
            out_of_scope,
            sources,
            sources_attached,
            mode: GroundingMode::from_evidence(evidence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::EvidenceCategory;

    fn policy() -> HandoffPolicy {
        HandoffPolicy::new(&DecisionConfig::default())
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_docs_only_escalates() {
        let evidence = EvidenceFlags::none().with(EvidenceCategory::Docs);
        let decision = policy().decide(
            "Product X costs 2.5% per transaction.",
            &evidence,
            &urls(&["https://x.com/fees"]),
        );

        assert_eq!(decision.confidence, 0.4);
        assert_eq!(decision.route, Route::Escalate);
        assert!(decision.sources.is_empty());
        assert_eq!(decision.mode, GroundingMode::SingleSource);
    }

    #[test]
    fn test_threshold_boundary_does_not_escalate() {
        let state = HandoffState::InScope.route(0.45, 0.45);
        assert_eq!(state.final_route(), Some(Route::Personality));

        let state = HandoffState::InScope.route(0.4499, 0.45);
        assert_eq!(state.final_route(), Some(Route::Escalate));
    }

    #[test]
    fn test_out_of_scope_wins_over_confidence() {
        let evidence = EvidenceFlags::from_categories(EvidenceCategory::ALL);
        let decision = policy().decide(
            "I don't know the answer to that.",
            &evidence,
            &urls(&["https://x.com/a"]),
        );

        assert!(decision.out_of_scope);
        assert_eq!(decision.route, Route::Personality);
        assert!(decision.sources.is_empty());
        assert!(!decision.sources_attached);

        let low = policy().decide("Não sei.", &EvidenceFlags::none(), &[]);
        assert_eq!(low.route, Route::Personality);
    }

    #[test]
    fn test_sources_sorted_deduped_capped() {
        let evidence = EvidenceFlags::from_categories(EvidenceCategory::ALL);
        let decision = policy().decide(
            "Pix is free for individuals.",
            &evidence,
            &urls(&["https://x.com/c", "https://x.com/a", "https://x.com/c", "https://x.com/b"]),
        );

        assert_eq!(decision.route, Route::Personality);
        assert_eq!(decision.sources, urls(&["https://x.com/a", "https://x.com/b"]));
        assert_eq!(
            decision.finalize_answer("Pix is free for individuals."),
            "Pix is free for individuals.\n\nSources: https://x.com/a, https://x.com/b"
        );
    }

    #[test]
    fn test_existing_sources_section_is_respected() {
        let evidence = EvidenceFlags::from_categories(EvidenceCategory::ALL);
        let answer = "Pix is free.\n\nSources: https://x.com/pix";
        let decision = policy().decide(answer, &evidence, &urls(&["https://x.com/a"]));

        assert!(!decision.sources_attached);
        assert_eq!(decision.finalize_answer(answer), answer);
    }

    #[test]
    fn test_state_machine_ignores_late_observations() {
        let routed = HandoffState::Routed(Route::Escalate);
        assert_eq!(
            routed.clone().observe(ScopeVerdict::InScope),
            HandoffState::Routed(Route::Escalate)
        );
        assert_eq!(routed.route(1.0, 0.0).final_route(), Some(Route::Escalate));
    }
}

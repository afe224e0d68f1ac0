//! Confidence scoring and handoff routing
//!
//! Confidence depends only on which evidence categories made it into the
//! context. An "I don't know" answer always ends at the persona step;
//! otherwise low confidence escalates.

pub mod confidence;
pub mod handoff;
pub mod scope;

use serde::{Deserialize, Serialize};

pub use confidence::{ConfidenceWeights, EvidenceFlags};
pub use handoff::{GroundingMode, GroundingResult, HandoffDecision, HandoffPolicy, HandoffState, Route};
pub use scope::{default_out_of_scope_phrases, OutOfScopeDetector, ScopeVerdict};

/// Decision configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub weights: ConfidenceWeights,

    /// Confidence strictly below this escalates
    pub handoff_confidence_threshold: f64,

    pub max_sources_cited: usize,

    pub out_of_scope_phrases: Vec<String>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            weights: ConfidenceWeights::default(),
            handoff_confidence_threshold: 0.45,
            max_sources_cited: 2,
            out_of_scope_phrases: default_out_of_scope_phrases(),
        }
    }
}

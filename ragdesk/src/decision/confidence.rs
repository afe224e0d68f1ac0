//! Presence-based confidence scoring

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::retrieval::EvidenceCategory;

/// Which evidence categories contributed non-empty content to the context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvidenceFlags {
    present: BTreeSet<EvidenceCategory>,
}

impl EvidenceFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_categories(categories: impl IntoIterator<Item = EvidenceCategory>) -> Self {
        Self {
            present: categories.into_iter().collect(),
        }
    }

    pub fn with(mut self, category: EvidenceCategory) -> Self {
        self.present.insert(category);
        self
    }

    pub fn contributed(&self, category: EvidenceCategory) -> bool {
        self.present.contains(&category)
    }

    pub fn count(&self) -> usize {
        self.present.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = EvidenceCategory> + '_ {
        self.present.iter().copied()
    }
}

/// Fixed contribution of each evidence category to the confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceWeights {
    pub docs: f64,
    pub faq: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self { docs: 0.4, faq: 0.3 }
    }
}

impl ConfidenceWeights {
    pub fn weight(&self, category: EvidenceCategory) -> f64 {
        match category {
            EvidenceCategory::Docs => self.docs,
            EvidenceCategory::Faq => self.faq,
        }
    }

    /// Sum of the weights of the categories that contributed, in `[0, 1]`.
    ///
    /// Depends only on presence, so adding a category never lowers the score
    /// as long as weights are non-negative.
    pub fn confidence(&self, evidence: &EvidenceFlags) -> f64 {
        evidence
            .iter()
            .map(|category| self.weight(category).max(0.0))
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_presence() {
        let weights = ConfidenceWeights::default();

        assert_eq!(weights.confidence(&EvidenceFlags::none()), 0.0);
        assert_eq!(
            weights.confidence(&EvidenceFlags::none().with(EvidenceCategory::Docs)),
            0.4
        );
        assert_eq!(
            weights.confidence(&EvidenceFlags::none().with(EvidenceCategory::Faq)),
            0.3
        );

        let both = EvidenceFlags::from_categories(EvidenceCategory::ALL);
        assert!((weights.confidence(&both) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let weights = ConfidenceWeights { docs: 0.8, faq: 0.9 };
        let both = EvidenceFlags::from_categories(EvidenceCategory::ALL);
        assert_eq!(weights.confidence(&both), 1.0);
    }

    #[test]
    fn test_flags_are_a_set() {
        let flags = EvidenceFlags::none()
            .with(EvidenceCategory::Faq)
            .with(EvidenceCategory::Faq);
        assert_eq!(flags.count(), 1);
        assert!(flags.contributed(EvidenceCategory::Faq));
        assert!(!flags.contributed(EvidenceCategory::Docs));
    }
}

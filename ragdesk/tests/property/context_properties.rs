use proptest::prelude::*;
use ragdesk::context::text::char_len;
use ragdesk::context::{allocate, trim_to_boundary, SectionDemand, DEFAULT_FLOOR_FRACTION};
use ragdesk::decision::{ConfidenceWeights, EvidenceFlags};
use ragdesk::EvidenceCategory;
use std::collections::BTreeMap;

fn demand(category: EvidenceCategory, char_count: usize) -> SectionDemand {
    SectionDemand {
        category,
        char_count,
        priority: category.priority(),
    }
}

fn minimums(faq: usize, docs: usize) -> BTreeMap<EvidenceCategory, usize> {
    BTreeMap::from([(EvidenceCategory::Faq, faq), (EvidenceCategory::Docs, docs)])
}

fn category() -> impl Strategy<Value = EvidenceCategory> {
    prop_oneof![Just(EvidenceCategory::Faq), Just(EvidenceCategory::Docs)]
}

proptest! {
    #[test]
    fn allocation_never_exceeds_budget(
        total in 0usize..10_000,
        faq_chars in 1usize..20_000,
        docs_chars in 1usize..20_000,
        min_faq in 0usize..2_000,
        min_docs in 0usize..2_000,
        floor in 0.0f64..0.6,
    ) {
        let sections = [
            demand(EvidenceCategory::Faq, faq_chars),
            demand(EvidenceCategory::Docs, docs_chars),
        ];
        let budget = allocate(total, &sections, &minimums(min_faq, min_docs), floor);

        prop_assert!(budget.allocated() <= total);
        if min_faq + min_docs <= total {
            prop_assert!(budget.allocation(EvidenceCategory::Faq) >= min_faq);
            prop_assert!(budget.allocation(EvidenceCategory::Docs) >= min_docs);
        }
    }

    #[test]
    fn single_section_gets_whole_budget(
        total in 0usize..10_000,
        chars in 1usize..20_000,
        category in category(),
    ) {
        let budget = allocate(
            total,
            &[demand(category, chars)],
            &minimums(600, 800),
            DEFAULT_FLOOR_FRACTION,
        );
        prop_assert_eq!(budget.allocation(category), total);
    }

    #[test]
    fn trimmed_content_fits_its_allocation(
        content in "[a-zA-Zçã .!?\n]{0,600}",
        limit in 0usize..700,
    ) {
        let trimmed = trim_to_boundary(&content, limit);
        prop_assert!(char_len(&trimmed) <= limit);
        prop_assert!(content.starts_with(trimmed.as_str()));

        if char_len(&content) <= limit {
            prop_assert_eq!(&trimmed, &content);
        }

        // Trimming is idempotent
        prop_assert_eq!(trim_to_boundary(&trimmed, limit), trimmed.clone());
    }

    #[test]
    fn more_evidence_never_lowers_confidence(
        docs in 0.0f64..=1.0,
        faq in 0.0f64..=1.0,
        start in prop::collection::vec(category(), 0..2),
        extra in category(),
    ) {
        let weights = ConfidenceWeights { docs, faq };
        let before = EvidenceFlags::from_categories(start);
        let after = before.clone().with(extra);

        let low = weights.confidence(&before);
        let high = weights.confidence(&after);
        prop_assert!(high >= low);
        prop_assert!((0.0..=1.0).contains(&high));
    }
}

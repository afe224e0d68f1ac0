//! Bounded context assembly from retrieved evidence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::budget::{allocate, ContextBudget, SectionDemand, DEFAULT_FLOOR_FRACTION};
use super::text::{char_len, clean_doc_text, dedup_preserving_order, trim_to_boundary, truncate_chars};
use super::topics::{default_topic_patterns, TopicFilter, TopicPattern};
use crate::retrieval::{EvidenceCategory, RetrievedItem};

/// Context builder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Hard ceiling on the assembled context, in chars
    pub max_context_chars: usize,

    pub min_chars_faq: usize,
    pub min_chars_docs: usize,

    /// Budget share guaranteed to each competing section
    pub floor_fraction: f64,

    /// Cap on a single formatted FAQ entry
    pub faq_item_max_chars: usize,

    pub topic_patterns: Vec<TopicPattern>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 3000,
            min_chars_faq: 600,
            min_chars_docs: 800,
            floor_fraction: DEFAULT_FLOOR_FRACTION,
            faq_item_max_chars: 700,
            topic_patterns: default_topic_patterns(),
        }
    }
}

impl ContextConfig {
    pub fn minimum_floor(&self) -> BTreeMap<EvidenceCategory, usize> {
        BTreeMap::from([
            (EvidenceCategory::Faq, self.min_chars_faq),
            (EvidenceCategory::Docs, self.min_chars_docs),
        ])
    }
}

/// One evidence category's text before trimming
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSection {
    pub category: EvidenceCategory,
    pub content: String,
    pub priority: u32,
    pub char_count: usize,
}

impl ContextSection {
    pub fn new(category: EvidenceCategory, content: String) -> Self {
        Self {
            category,
            priority: category.priority(),
            char_count: char_len(&content),
            content,
        }
    }

    pub fn name(&self) -> &'static str {
        self.category.as_str()
    }

    fn demand(&self) -> SectionDemand {
        SectionDemand {
            category: self.category,
            char_count: self.char_count,
            priority: self.priority,
        }
    }
}

/// What went into the assembled context
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextMetadata {
    pub context_char_count: usize,
    /// Categories that produced a section, before trimming
    pub sections: Vec<EvidenceCategory>,
    /// Trimmed length of each section that made it into the context
    pub section_lengths: BTreeMap<EvidenceCategory, usize>,
    pub budget_allocation: BTreeMap<EvidenceCategory, usize>,
    pub source_urls: Vec<String>,
    /// Whether topic filtering removed any document
    pub filtered: bool,
    pub faq_items: usize,
    pub docs_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuiltContext {
    pub context: String,
    pub metadata: ContextMetadata,
}

impl BuiltContext {
    pub fn is_empty(&self) -> bool {
        self.context.trim().is_empty()
    }

    /// Categories whose trimmed content survived into the context
    pub fn contributing(&self) -> Vec<EvidenceCategory> {
        self.metadata.section_lengths.keys().copied().collect()
    }
}

/// Turns per-category evidence into one bounded context string
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: ContextConfig,
    topics: TopicFilter,
}

impl ContextBuilder {
    pub fn new(config: ContextConfig) -> Self {
        let topics = TopicFilter::new(config.topic_patterns.clone());
        Self { config, topics }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Format one FAQ item as `Q:`/`A:` text with its source, capped in size
    pub fn format_faq(&self, item: &RetrievedItem) -> String {
        let suffix = item
            .url()
            .map(|url| format!(" | Source: {}", url))
            .unwrap_or_default();

        let answer = item.get("answer").unwrap_or(item.content.as_str());
        let text = match item.get("question") {
            Some(question) if !answer.is_empty() => format!("Q: {}\nA: {}{}", question, answer, suffix),
            _ => format!("{}{}", item.content, suffix),
        };

        truncate_chars(&text, self.config.faq_item_max_chars).to_string()
    }

    /// Build the context for `question` from document and FAQ evidence.
    ///
    /// With no usable evidence the context is empty and the caller decides
    /// what to do instead.
    pub fn build(&self, question: &str, docs: &[RetrievedItem], faq: &[RetrievedItem]) -> BuiltContext {
        let (docs_kept, filtered) = self.topics.apply(question, docs);

        let docs_text = docs_kept
            .iter()
            .map(|item| clean_doc_text(&item.content))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let faq_text = faq
            .iter()
            .map(|item| self.format_faq(item))
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut sections: Vec<ContextSection> = [
            (EvidenceCategory::Faq, faq_text),
            (EvidenceCategory::Docs, docs_text),
        ]
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(category, text)| ContextSection::new(category, text))
        .collect();
        sections.sort_by_key(|s| s.category);

        let demands: Vec<SectionDemand> = sections.iter().map(ContextSection::demand).collect();
        let budget = allocate(
            self.config.max_context_chars,
            &demands,
            &self.config.minimum_floor(),
            self.config.floor_fraction,
        );

        let (context, section_lengths) = assemble(&sections, &budget);

        let source_urls =
            dedup_preserving_order(docs_kept.iter().copied().chain(faq.iter()).filter_map(RetrievedItem::url));

        debug!(
            "Built context: {} chars from {} sections (budget {:?})",
            char_len(&context),
            sections.len(),
            budget.allocations
        );

        BuiltContext {
            metadata: ContextMetadata {
                context_char_count: char_len(&context),
                sections: sections.iter().map(|s| s.category).collect(),
                section_lengths,
                budget_allocation: budget.allocations.clone(),
                source_urls,
                filtered,
                faq_items: faq.len(),
                docs_items: docs_kept.len(),
            },
            context,
        }
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}

/// Trim every section to its allocation and join them in category order.
///
/// Section headers and separators are not charged to the budget.
fn assemble(
    sections: &[ContextSection],
    budget: &ContextBudget,
) -> (String, BTreeMap<EvidenceCategory, usize>) {
    let mut parts = Vec::with_capacity(sections.len());
    let mut lengths = BTreeMap::new();

    for section in sections {
        let allocation = budget.allocation(section.category);
        if allocation == 0 {
            continue;
        }

        let trimmed = trim_to_boundary(&section.content, allocation);
        let trimmed = trimmed.trim();
        if trimmed.is_empty() {
            continue;
        }

        lengths.insert(section.category, char_len(trimmed));
        parts.push(format!("{}\n{}", section.category.header(), trimmed));
    }

    (parts.join("\n\n"), lengths)
}

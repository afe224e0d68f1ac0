//! Topic-based narrowing of document evidence

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedItem;

/// A keyword that, when present in the question, restricts documents to
/// those whose URL contains one of `url_patterns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPattern {
    pub keyword: String,
    pub url_patterns: Vec<String>,
}

impl TopicPattern {
    pub fn new(keyword: &str, url_patterns: &[&str]) -> Self {
        Self {
            keyword: keyword.to_string(),
            url_patterns: url_patterns.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Product keywords and the URL paths that document them
pub fn default_topic_patterns() -> Vec<TopicPattern> {
    vec![
        TopicPattern::new("maquininha", &["/maquininha"]),
        TopicPattern::new("maquininha smart", &["/maquininha"]),
        TopicPattern::new("maquininha celular", &["/maquininha-celular", "/tap-to-pay"]),
        TopicPattern::new("tap to pay", &["/tap-to-pay", "/maquininha-celular"]),
        TopicPattern::new("pix", &["/pix"]),
        TopicPattern::new("pdv", &["/pdv"]),
        TopicPattern::new("boleto", &["/boleto"]),
        TopicPattern::new("conta", &["/conta", "/conta-digital"]),
        TopicPattern::new("cartao", &["/cartao"]),
        TopicPattern::new("cartão", &["/cartao"]),
        TopicPattern::new("emprestimo", &["/emprestimo"]),
        TopicPattern::new("empréstimo", &["/emprestimo"]),
    ]
}

#[derive(Debug, Clone)]
pub struct TopicFilter {
    patterns: Vec<TopicPattern>,
}

impl TopicFilter {
    pub fn new(patterns: Vec<TopicPattern>) -> Self {
        Self { patterns }
    }

    /// URL patterns triggered by keywords in `question`
    pub fn relevant_patterns(&self, question: &str) -> Vec<&str> {
        let question = question.to_lowercase();
        self.patterns
            .iter()
            .filter(|topic| question.contains(&topic.keyword.to_lowercase()))
            .flat_map(|topic| topic.url_patterns.iter().map(String::as_str))
            .collect()
    }

    /// Keep the items relevant to the question's topics.
    ///
    /// Returns the kept items and whether anything was removed. When no topic
    /// matches, or no item matches the topic, every item is kept.
    pub fn apply<'a>(&self, question: &str, items: &'a [RetrievedItem]) -> (Vec<&'a RetrievedItem>, bool) {
        let patterns = self.relevant_patterns(question);
        let all: Vec<&RetrievedItem> = items.iter().collect();
        if patterns.is_empty() {
            return (all, false);
        }

        let matching: Vec<&RetrievedItem> = items
            .iter()
            .filter(|item| {
                item.url().is_some_and(|url| {
                    let url = url.to_lowercase();
                    patterns.iter().any(|p| url.contains(p))
                })
            })
            .collect();

        if matching.is_empty() {
            (all, false)
        } else {
            let filtered = matching.len() != items.len();
            (matching, filtered)
        }
    }
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::new(default_topic_patterns())
    }
}

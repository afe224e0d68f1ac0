//! Common types for the retrieval module

use crate::error::{ProviderError, RetrievalError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Evidence category a retrieved item belongs to.
///
/// Declaration order is assembly order: higher-priority categories first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    /// Curated question/answer pairs
    Faq,
    /// Free-text documentation chunks
    Docs,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 2] = [EvidenceCategory::Faq, EvidenceCategory::Docs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "faq",
            Self::Docs => "docs",
        }
    }

    /// Weight used when sharing the context budget
    pub fn priority(&self) -> u32 {
        match self {
            Self::Faq => 3,
            Self::Docs => 2,
        }
    }

    /// Header line introducing the section in the assembled context
    pub fn header(&self) -> String {
        format!("[{}]", self.as_str().to_uppercase())
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieval backends the orchestrator knows how to call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    SemanticVector,
    Faq,
}

impl ProviderKind {
    /// Fixed order used for sequential execution and for reporting
    pub const ALL: [ProviderKind; 2] = [ProviderKind::SemanticVector, ProviderKind::Faq];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SemanticVector => "semantic_vector",
            Self::Faq => "faq",
        }
    }

    pub fn category(&self) -> EvidenceCategory {
        match self {
            Self::SemanticVector => EvidenceCategory::Docs,
            Self::Faq => EvidenceCategory::Faq,
        }
    }

    /// Handle name populated by warm-up
    pub fn lazy_handle(&self) -> &'static str {
        match self {
            Self::SemanticVector => "vector_retriever_lazy",
            Self::Faq => "faq_retriever_lazy",
        }
    }

    /// Handle name populated on first use
    pub fn main_handle(&self) -> &'static str {
        match self {
            Self::SemanticVector => "vector_main",
            Self::Faq => "faq_main",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "semantic_vector" | "vector" | "docs" => Some(Self::SemanticVector),
            "faq" => Some(Self::Faq),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified item shape every provider returns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RetrievedItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Source URL: `url`, falling back to `source`
    pub fn url(&self) -> Option<&str> {
        self.get("url").or_else(|| self.get("source"))
    }
}

/// Outcome of one provider call for one request
///
/// Built once through its constructors and read through accessors, so the
/// `success == error.is_none()` relation always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    provider: ProviderKind,
    items: Vec<RetrievedItem>,
    latency_ms: f64,
    connect_latency_ms: f64,
    error: Option<RetrievalError>,
    success: bool,
    cache_hit: bool,
}

impl RetrievalResult {
    pub fn ok(
        provider: ProviderKind,
        items: Vec<RetrievedItem>,
        latency_ms: f64,
        connect_latency_ms: f64,
    ) -> Self {
        Self {
            provider,
            items,
            latency_ms,
            connect_latency_ms,
            error: None,
            success: true,
            cache_hit: false,
        }
    }

    /// Result served from the retrieval cache
    pub fn cached(provider: ProviderKind, items: Vec<RetrievedItem>, latency_ms: f64) -> Self {
        Self {
            cache_hit: true,
            ..Self::ok(provider, items, latency_ms, 0.0)
        }
    }

    pub fn failed(
        provider: ProviderKind,
        error: &ProviderError,
        latency_ms: f64,
        connect_latency_ms: f64,
    ) -> Self {
        Self {
            provider,
            items: Vec::new(),
            latency_ms,
            connect_latency_ms,
            error: Some(RetrievalError::from(error)),
            success: false,
            cache_hit: false,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.provider
    }

    pub fn items(&self) -> &[RetrievedItem] {
        &self.items
    }

    pub fn latency_ms(&self) -> f64 {
        self.latency_ms
    }

    pub fn connect_latency_ms(&self) -> f64 {
        self.connect_latency_ms
    }

    pub fn error(&self) -> Option<&RetrievalError> {
        self.error.as_ref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn cache_hit(&self) -> bool {
        self.cache_hit
    }
}

/// How the orchestrator ran the providers for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    Sequential,
    Parallel,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
        }
    }
}

/// Everything one `orchestrate` call produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// One result per requested provider, in [`ProviderKind::ALL`] order
    pub results: Vec<RetrievalResult>,
    pub strategy: ExecutionStrategy,
    pub complexity: usize,
    pub elapsed_ms: f64,
}

impl RetrievalOutcome {
    pub fn result(&self, kind: ProviderKind) -> Option<&RetrievalResult> {
        self.results.iter().find(|r| r.provider() == kind)
    }

    /// Items from a successful call, or nothing
    pub fn items(&self, kind: ProviderKind) -> &[RetrievedItem] {
        match self.result(kind) {
            Some(result) if result.success() => result.items(),
            _ => &[],
        }
    }

    pub fn all_failed(&self) -> bool {
        self.results.iter().all(|r| !r.success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_url_fallback() {
        let item = RetrievedItem::new("text").with_metadata("source", "https://example.com/pix");
        assert_eq!(item.url(), Some("https://example.com/pix"));

        let item = item.with_metadata("url", "https://example.com/boleto");
        assert_eq!(item.url(), Some("https://example.com/boleto"));

        let empty = RetrievedItem::new("text").with_metadata("url", "");
        assert_eq!(empty.url(), None);
    }

    #[test]
    fn test_failed_result_invariant() {
        let err = ProviderError::Backend("down".to_string());
        let result = RetrievalResult::failed(ProviderKind::Faq, &err, 12.0, 0.0);
        assert!(!result.success());
        assert!(result.error().is_some());
        assert!(result.items().is_empty());

        let ok = RetrievalResult::ok(ProviderKind::Faq, vec![RetrievedItem::new("a")], 5.0, 1.0);
        assert!(ok.success());
        assert!(ok.error().is_none());
        assert!(!ok.cache_hit());
    }

    #[test]
    fn test_cached_result() {
        let result = RetrievalResult::cached(ProviderKind::SemanticVector, vec![], 0.01);
        assert!(result.cache_hit());
        assert!(result.success());
        assert_eq!(result.connect_latency_ms(), 0.0);
    }

    #[test]
    fn test_outcome_items_skip_failures() {
        let err = ProviderError::NotConfigured("faq".to_string());
        let outcome = RetrievalOutcome {
            results: vec![
                RetrievalResult::ok(
                    ProviderKind::SemanticVector,
                    vec![RetrievedItem::new("doc")],
                    1.0,
                    0.0,
                ),
                RetrievalResult::failed(ProviderKind::Faq, &err, 0.0, 0.0),
            ],
            strategy: ExecutionStrategy::Sequential,
            complexity: 3,
            elapsed_ms: 1.0,
        };

        assert_eq!(outcome.items(ProviderKind::SemanticVector).len(), 1);
        assert!(outcome.items(ProviderKind::Faq).is_empty());
        assert!(!outcome.all_failed());
    }

    #[test]
    fn test_category_order_and_headers() {
        assert!(EvidenceCategory::Faq < EvidenceCategory::Docs);
        assert_eq!(EvidenceCategory::Docs.header(), "[DOCS]");
        assert_eq!(ProviderKind::SemanticVector.category(), EvidenceCategory::Docs);
        assert_eq!(ProviderKind::parse("vector"), Some(ProviderKind::SemanticVector));
    }
}

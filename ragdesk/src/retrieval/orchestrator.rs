//! Retrieval orchestration: strategy selection, fan-out and timeouts

use futures::stream::{self, StreamExt};
use ragdesk_cache::CacheManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::provider::ProviderRegistry;
use super::types::{ExecutionStrategy, ProviderKind, RetrievalOutcome, RetrievalResult, RetrievedItem};
use crate::error::ProviderError;

/// Namespace for cached retrieval results in the general tier
pub const RETRIEVAL_NAMESPACE: &str = "retrieval";

/// Retrieval orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Timeout for the semantic-vector provider, in seconds
    pub timeout_semantic_secs: f64,

    /// Timeout for the FAQ provider, in seconds
    pub timeout_faq_secs: f64,

    /// Minimum complexity score for parallel execution
    pub complexity_threshold: usize,

    /// Upper bound on concurrently running provider calls
    pub max_retrieval_workers: usize,

    pub enable_parallel: bool,

    /// How long successful results stay cached
    pub result_cache_ttl_secs: u64,

    /// Items requested from the semantic-vector provider
    pub vector_k: usize,

    /// Items requested from the FAQ provider
    pub faq_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_semantic_secs: 3.0,
            timeout_faq_secs: 0.8,
            complexity_threshold: 10,
            max_retrieval_workers: 4,
            enable_parallel: true,
            result_cache_ttl_secs: 300,
            vector_k: 3,
            faq_k: 2,
        }
    }
}

impl RetrievalConfig {
    pub fn timeout_for(&self, kind: ProviderKind) -> Duration {
        let secs = match kind {
            ProviderKind::SemanticVector => self.timeout_semantic_secs,
            ProviderKind::Faq => self.timeout_faq_secs,
        };
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn result_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.result_cache_ttl_secs)
    }

    pub fn k_for(&self, kind: ProviderKind) -> usize {
        match kind {
            ProviderKind::SemanticVector => self.vector_k,
            ProviderKind::Faq => self.faq_k,
        }
    }
}

/// Heuristic query complexity: word count, plus one per word longer than
/// eight characters, plus one per `?` and `!`.
pub fn analyze_complexity(query: &str) -> usize {
    let words: Vec<&str> = query.split_whitespace().collect();
    let long_words = words.iter().filter(|w| w.chars().count() > 8).count();
    let marks = query.chars().filter(|c| matches!(c, '?' | '!')).count();

    words.len() + long_words + marks
}

/// Static orchestrator settings, for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStats {
    pub max_workers: usize,
    pub complexity_threshold: usize,
    pub parallel_enabled: bool,
    pub providers: Vec<ProviderKind>,
}

/// Runs the configured providers for a query and always returns one result
/// per provider.
pub struct RetrievalOrchestrator {
    config: RetrievalConfig,
    cache: Arc<CacheManager>,
    registry: ProviderRegistry,
}

impl RetrievalOrchestrator {
    pub fn new(config: RetrievalConfig, cache: Arc<CacheManager>, registry: ProviderRegistry) -> Self {
        info!(
            "RetrievalOrchestrator initialized: workers={}, complexity_threshold={}, parallel={}",
            config.max_retrieval_workers, config.complexity_threshold, config.enable_parallel
        );

        Self {
            config,
            cache,
            registry,
        }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Strategy that `orchestrate` would pick, with the complexity score
    pub fn select_strategy(&self, query: &str, provider_count: usize) -> (ExecutionStrategy, usize) {
        let complexity = analyze_complexity(query);
        let parallel = provider_count > 1
            && self.config.enable_parallel
            && complexity >= self.config.complexity_threshold;

        let strategy = if parallel {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Sequential
        };
        (strategy, complexity)
    }

    /// Retrieve from every requested provider.
    ///
    /// Returns within the sum (sequential) or roughly the maximum (parallel,
    /// with enough workers) of the per-provider timeouts. Provider errors and
    /// timeouts come back as unsuccessful results; a panicking provider is
    /// reported the same way.
    pub async fn orchestrate(&self, query: &str, kinds: &[ProviderKind]) -> RetrievalOutcome {
        let start = Instant::now();

        let mut kinds = kinds.to_vec();
        kinds.sort();
        kinds.dedup();

        let (strategy, complexity) = self.select_strategy(query, kinds.len());

        if kinds.is_empty() {
            return RetrievalOutcome {
                results: Vec::new(),
                strategy,
                complexity,
                elapsed_ms: 0.0,
            };
        }

        debug!(
            "Running {} retrieval for query (complexity {}): '{}'",
            strategy, complexity, query
        );

        let mut results = match strategy {
            ExecutionStrategy::Sequential => {
                let mut results = Vec::with_capacity(kinds.len());
                for kind in &kinds {
                    results.push(self.execute(query, *kind).await);
                }
                results
            }
            ExecutionStrategy::Parallel => {
                // Each call runs on its own task; timed-out ones are aborted
                stream::iter(kinds.iter().copied())
                    .map(|kind| self.execute(query, kind))
                    .buffer_unordered(self.config.max_retrieval_workers.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
        };
        results.sort_by_key(|r| r.provider());

        RetrievalOutcome {
            results,
            strategy,
            complexity,
            elapsed_ms: elapsed_ms(start),
        }
    }

    /// One provider call: cache lookup, then handle resolution and the call
    /// itself on their own task, bounded by the provider's timeout, then a
    /// cache write on success.
    async fn execute(&self, query: &str, kind: ProviderKind) -> RetrievalResult {
        let start = Instant::now();
        let cache_key = format!("{}:{}", kind.category(), query);

        if let Some(items) = self
            .cache
            .get_json::<Vec<RetrievedItem>>(&cache_key, RETRIEVAL_NAMESPACE)
        {
            debug!("Retrieval cache hit for {}", kind);
            return RetrievalResult::cached(kind, items, elapsed_ms(start));
        }

        let timeout = self.config.timeout_for(kind);
        let mut call = tokio::spawn(call_provider(
            self.registry.clone(),
            kind,
            query.to_string(),
        ));

        let (outcome, connect_ms) = match tokio::time::timeout(timeout, &mut call).await {
            Ok(Ok(finished)) => finished,
            Ok(Err(e)) => (Err(task_failure(kind, e)), 0.0),
            Err(_) => {
                call.abort();
                let e = ProviderError::Timeout {
                    provider: kind.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                };
                (Err(e), 0.0)
            }
        };

        match outcome {
            Ok(items) => {
                self.cache.set_json(
                    &cache_key,
                    RETRIEVAL_NAMESPACE,
                    &items,
                    Some(self.config.result_cache_ttl()),
                );
                RetrievalResult::ok(kind, items, elapsed_ms(start), connect_ms)
            }
            Err(e) => {
                warn!("{} retrieval failed: {}", kind, e);
                RetrievalResult::failed(kind, &e, elapsed_ms(start), connect_ms)
            }
        }
    }

    pub fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            max_workers: self.config.max_retrieval_workers,
            complexity_threshold: self.config.complexity_threshold,
            parallel_enabled: self.config.enable_parallel,
            providers: self.registry.kinds(),
        }
    }
}

/// Resolve the handle and run the call. Returns the outcome with the time
/// spent resolving the handle, in milliseconds.
async fn call_provider(
    registry: ProviderRegistry,
    kind: ProviderKind,
    query: String,
) -> (Result<Vec<RetrievedItem>, ProviderError>, f64) {
    let connect_start = Instant::now();
    let provider = match registry.cached(kind) {
        Some(provider) => Ok(provider),
        None => tokio::task::spawn_blocking(move || registry.resolve(kind))
            .await
            .unwrap_or_else(|e| Err(task_failure(kind, e))),
    };
    let connect_ms = elapsed_ms(connect_start);

    match provider {
        Ok(provider) => (provider.retrieve(&query).await, connect_ms),
        Err(e) => (Err(e), connect_ms),
    }
}

/// A provider task that panicked or was cancelled counts as a provider error
fn task_failure(kind: ProviderKind, error: JoinError) -> ProviderError {
    if error.is_panic() {
        ProviderError::Backend(format!("{} provider panicked", kind))
    } else {
        ProviderError::Backend(format!("{} provider call was cancelled", kind))
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalErrorKind;
    use crate::retrieval::provider::{ProviderHandle, RetrievalProvider};
    use async_trait::async_trait;
    use ragdesk_cache::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        kind: ProviderKind,
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(kind: ProviderKind, delay_ms: u64, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                kind,
                delay: Duration::from_millis(delay_ms),
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RetrievalProvider for Scripted {
        fn kind(&self) -> ProviderKind {
            self.kind
        }

        async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(ProviderError::Backend("scripted failure".to_string()));
            }
            Ok(vec![RetrievedItem::new(format!("{} answer for {}", self.kind, query))])
        }
    }

    struct Panicking;

    #[async_trait]
    impl RetrievalProvider for Panicking {
        fn kind(&self) -> ProviderKind {
            ProviderKind::SemanticVector
        }

        async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
            let hits: Vec<RetrievedItem> = Vec::new();
            Ok(vec![hits[0].clone()])
        }
    }

    fn orchestrator(providers: Vec<Arc<Scripted>>, config: RetrievalConfig) -> RetrievalOrchestrator {
        let cache = Arc::new(CacheManager::new(CacheConfig::default()));
        let mut registry = ProviderRegistry::new(cache.clone());
        for provider in providers {
            registry = registry.with_provider(provider as ProviderHandle);
        }
        RetrievalOrchestrator::new(config, cache, registry)
    }

    #[test]
    fn test_complexity_score() {
        assert_eq!(analyze_complexity(""), 0);
        assert_eq!(analyze_complexity("fees?"), 2);
        // 3 words, "transactions" is long, one '?' and one '!'
        assert_eq!(analyze_complexity("why transactions failed?!"), 3 + 1 + 2);
    }

    #[test]
    fn test_strategy_selection() {
        let orch = orchestrator(vec![], RetrievalConfig::default());
        let long = "what are the monthly maintenance fees for the smart card machine plan?";

        assert_eq!(orch.select_strategy(long, 2).0, ExecutionStrategy::Parallel);
        assert_eq!(orch.select_strategy(long, 1).0, ExecutionStrategy::Sequential);
        assert_eq!(orch.select_strategy("fees?", 2).0, ExecutionStrategy::Sequential);

        let disabled = orchestrator(
            vec![],
            RetrievalConfig {
                enable_parallel: false,
                ..Default::default()
            },
        );
        assert_eq!(disabled.select_strategy(long, 2).0, ExecutionStrategy::Sequential);
    }

    #[tokio::test]
    async fn test_no_kinds_returns_empty() {
        let orch = orchestrator(vec![], RetrievalConfig::default());
        let outcome = orch.orchestrate("anything", &[]).await;
        assert!(outcome.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_failed_result() {
        let slow = Scripted::new(ProviderKind::Faq, 5_000, false);
        let orch = orchestrator(vec![slow], RetrievalConfig::default());

        let outcome = orch.orchestrate("fees", &[ProviderKind::Faq]).await;
        let result = outcome.result(ProviderKind::Faq).expect("faq result");

        assert!(!result.success());
        assert_eq!(result.error().map(|e| e.kind), Some(RetrievalErrorKind::Timeout));
        assert!(outcome.elapsed_ms < 1_000.0);
    }

    #[tokio::test]
    async fn test_unregistered_provider_is_not_configured() {
        let orch = orchestrator(vec![], RetrievalConfig::default());
        let outcome = orch.orchestrate("fees", &[ProviderKind::SemanticVector]).await;
        let result = outcome.result(ProviderKind::SemanticVector).expect("result");
        assert_eq!(
            result.error().map(|e| e.kind),
            Some(RetrievalErrorKind::NotConfigured)
        );
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let faq = Scripted::new(ProviderKind::Faq, 0, false);
        let orch = orchestrator(vec![faq.clone()], RetrievalConfig::default());

        let first = orch.orchestrate("pix limits", &[ProviderKind::Faq]).await;
        let second = orch.orchestrate("pix limits", &[ProviderKind::Faq]).await;

        assert_eq!(faq.calls.load(Ordering::SeqCst), 1);
        assert!(!first.results[0].cache_hit());
        assert!(second.results[0].cache_hit());
        assert_eq!(first.results[0].items(), second.results[0].items());
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let faq = Scripted::new(ProviderKind::Faq, 0, true);
        let orch = orchestrator(vec![faq.clone()], RetrievalConfig::default());

        orch.orchestrate("pix", &[ProviderKind::Faq]).await;
        orch.orchestrate("pix", &[ProviderKind::Faq]).await;
        assert_eq!(faq.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_partial_failure() {
        let docs = Scripted::new(ProviderKind::SemanticVector, 100, false);
        let faq = Scripted::new(ProviderKind::Faq, 10, true);
        let orch = orchestrator(vec![docs, faq], RetrievalConfig::default());

        let query = "how do I configure automatic settlement for international transactions?";
        let outcome = orch
            .orchestrate(query, &[ProviderKind::Faq, ProviderKind::SemanticVector])
            .await;

        assert_eq!(outcome.strategy, ExecutionStrategy::Parallel);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].provider(), ProviderKind::SemanticVector);
        assert!(outcome.results[0].success());
        assert!(!outcome.results[1].success());
    }

    #[tokio::test]
    async fn test_panicking_provider_is_a_provider_error() {
        let cache = Arc::new(CacheManager::new(CacheConfig::default()));
        let registry = ProviderRegistry::new(cache.clone())
            .with_provider(Arc::new(Panicking))
            .with_provider(Scripted::new(ProviderKind::Faq, 0, false));
        let orch = RetrievalOrchestrator::new(RetrievalConfig::default(), cache, registry);

        let outcome = orch
            .orchestrate("fees", &[ProviderKind::SemanticVector, ProviderKind::Faq])
            .await;

        let docs = outcome.result(ProviderKind::SemanticVector).expect("docs result");
        assert!(!docs.success());
        assert_eq!(docs.error().map(|e| e.kind), Some(RetrievalErrorKind::ProviderError));
        assert!(outcome.result(ProviderKind::Faq).expect("faq result").success());
    }

    #[tokio::test]
    async fn test_panicking_factory_is_a_provider_error() {
        let cache = Arc::new(CacheManager::new(CacheConfig::default()));
        let registry = ProviderRegistry::new(cache.clone())
            .register(ProviderKind::Faq, || panic!("index is corrupt"));
        let orch = RetrievalOrchestrator::new(RetrievalConfig::default(), cache, registry);

        let outcome = orch.orchestrate("fees", &[ProviderKind::Faq]).await;
        assert_eq!(
            outcome.results[0].error().map(|e| e.kind),
            Some(RetrievalErrorKind::ProviderError)
        );
    }
}

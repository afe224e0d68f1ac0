//! Retrieval provider contract and handle resolution

use async_trait::async_trait;
use ragdesk_cache::CacheManager;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::types::{ProviderKind, RetrievedItem};
use crate::error::ProviderError;

/// A source of evidence for a question.
///
/// Implementations may fail or be slow; the orchestrator bounds every call
/// with a timeout and never lets an error escape.
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Which evidence source this provider serves
    fn kind(&self) -> ProviderKind;

    /// Return the items relevant to `query`, best first
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedItem>, ProviderError>;
}

/// Shared, long-lived provider instance
pub type ProviderHandle = Arc<dyn RetrievalProvider>;

/// Builds a provider instance on demand (connect, load an index, ...)
pub type ProviderFactory = Arc<dyn Fn() -> Result<ProviderHandle, ProviderError> + Send + Sync>;

/// Resolves provider handles through the cache's handle tier.
///
/// Lookup order: warmed-up `*_lazy` handle, then `*_main` handle, then build
/// a fresh instance and cache it as `*_main`.
#[derive(Clone)]
pub struct ProviderRegistry {
    cache: Arc<CacheManager>,
    factories: BTreeMap<ProviderKind, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self {
            cache,
            factories: BTreeMap::new(),
        }
    }

    /// Register how to build the provider for `kind`
    pub fn register<F>(mut self, kind: ProviderKind, factory: F) -> Self
    where
        F: Fn() -> Result<ProviderHandle, ProviderError> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Arc::new(factory));
        self
    }

    /// Register an already-built provider under its own kind
    pub fn with_provider(self, provider: ProviderHandle) -> Self {
        let kind = provider.kind();
        self.register(kind, move || Ok(provider.clone()))
    }

    /// Kinds with a registered factory, in execution order
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.factories.keys().copied().collect()
    }

    fn cached_handle(&self, name: &str) -> Option<ProviderHandle> {
        self.cache
            .get_handle::<ProviderHandle>(name)
            .map(|handle| handle.as_ref().clone())
    }

    fn build(&self, kind: ProviderKind) -> Result<ProviderHandle, ProviderError> {
        let factory = self.factories.get(&kind).ok_or_else(|| {
            ProviderError::NotConfigured(format!("no {} provider registered", kind))
        })?;
        factory()
    }

    /// Already-built handle for `kind`, warmed-up one first. Never runs a
    /// factory.
    pub fn cached(&self, kind: ProviderKind) -> Option<ProviderHandle> {
        self.cached_handle(kind.lazy_handle())
            .or_else(|| self.cached_handle(kind.main_handle()))
    }

    /// Find or build the handle for `kind`.
    ///
    /// Building may block (loading an index, connecting), so async callers
    /// should run this off the runtime threads when `cached` misses.
    pub fn resolve(&self, kind: ProviderKind) -> Result<ProviderHandle, ProviderError> {
        if let Some(handle) = self.cached(kind) {
            return Ok(handle);
        }

        debug!("Building {} provider", kind);
        let handle = self.build(kind)?;
        self.cache
            .set_handle(kind.main_handle(), Arc::new(handle.clone()));
        Ok(handle)
    }

    /// Build every registered provider ahead of the first request and store
    /// it under its `*_lazy` handle. Failures are logged and skipped.
    ///
    /// Returns the number of providers warmed up.
    pub fn warm_up(&self) -> usize {
        let mut warmed = 0;

        for kind in self.kinds() {
            match self.build(kind) {
                Ok(handle) => {
                    self.cache.set_handle(kind.lazy_handle(), Arc::new(handle));
                    warmed += 1;
                }
                Err(e) => warn!("Warm-up of {} provider failed: {}", kind, e),
            }
        }

        info!("Warmed up {}/{} retrieval providers", warmed, self.factories.len());
        warmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdesk_cache::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(ProviderKind);

    #[async_trait]
    impl RetrievalProvider for Fixed {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn retrieve(&self, _query: &str) -> Result<Vec<RetrievedItem>, ProviderError> {
            Ok(vec![RetrievedItem::new("fixed")])
        }
    }

    fn cache() -> Arc<CacheManager> {
        Arc::new(CacheManager::new(CacheConfig::default()))
    }

    fn counting_registry(cache: Arc<CacheManager>, built: Arc<AtomicUsize>) -> ProviderRegistry {
        ProviderRegistry::new(cache).register(ProviderKind::Faq, move || {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed(ProviderKind::Faq)) as ProviderHandle)
        })
    }

    #[test]
    fn test_resolve_builds_once_and_caches_main_handle() {
        let cache = cache();
        let built = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(cache.clone(), built.clone());

        assert!(registry.resolve(ProviderKind::Faq).is_ok());
        assert!(registry.resolve(ProviderKind::Faq).is_ok());

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(cache.get_handle::<ProviderHandle>("faq_main").is_some());
    }

    #[test]
    fn test_cached_never_builds() {
        let cache = cache();
        let built = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(cache, built.clone());

        assert!(registry.cached(ProviderKind::Faq).is_none());
        assert_eq!(built.load(Ordering::SeqCst), 0);

        assert!(registry.resolve(ProviderKind::Faq).is_ok());
        assert!(registry.cached(ProviderKind::Faq).is_some());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_warm_up_populates_lazy_handle() {
        let cache = cache();
        let built = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(cache.clone(), built.clone());

        assert_eq!(registry.warm_up(), 1);
        assert!(registry.resolve(ProviderKind::Faq).is_ok());

        // resolution used the warmed handle, no second build
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(cache.get_handle::<ProviderHandle>("faq_main").is_none());
    }

    #[test]
    fn test_unregistered_kind_is_not_configured() {
        let registry = ProviderRegistry::new(cache());
        let err = registry.resolve(ProviderKind::SemanticVector).err();
        assert!(matches!(err, Some(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_failing_factory_is_skipped_by_warm_up() {
        let registry = ProviderRegistry::new(cache())
            .register(ProviderKind::SemanticVector, || {
                Err(ProviderError::NotConfigured("missing index".to_string()))
            })
            .with_provider(Arc::new(Fixed(ProviderKind::Faq)));

        assert_eq!(registry.warm_up(), 1);
        assert_eq!(
            registry.kinds(),
            vec![ProviderKind::SemanticVector, ProviderKind::Faq]
        );
    }
}

//! Process-wide cache manager holding every tier behind one lock

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::Result;
use crate::keys::{content_key, namespaced_key};
use crate::store::Tier;
use crate::types::{CacheStats, TierKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Type-erased shared handle stored in the handle tier
pub type SharedHandle = Arc<dyn Any + Send + Sync>;

/// Value keyed by a digest of `source`. The source is kept so a digest
/// collision is caught on read instead of serving another input's value.
#[derive(Debug, Clone)]
struct Digested<V> {
    source: String,
    value: V,
}

impl<V> Digested<V> {
    fn new(source: &str, value: V) -> Self {
        Self {
            source: source.to_string(),
            value,
        }
    }
}

struct Tiers {
    embedding: Tier<Digested<Vec<f32>>>,
    response: Tier<Digested<String>>,
    handle: Tier<SharedHandle>,
    general: Tier<serde_json::Value>,
}

impl Tiers {
    fn purge_expired(&mut self, now: chrono::DateTime<chrono::Utc>) -> usize {
        self.embedding.purge_expired(now)
            + self.response.purge_expired(now)
            + self.handle.purge_expired(now)
            + self.general.purge_expired(now)
    }

    fn len(&self, kind: TierKind) -> usize {
        match kind {
            TierKind::Embedding => self.embedding.len(),
            TierKind::Response => self.response.len(),
            TierKind::Handle => self.handle.len(),
            TierKind::General => self.general.len(),
        }
    }
}

/// Multi-tier cache with TTL expiration and LRU eviction
///
/// Services receive an `Arc<CacheManager>` explicitly; there is no global
/// instance. All tiers share one mutex, so operations serialize but stay
/// short: O(1) expected for hits, O(tier size) for the expiry purge and
/// eviction scan done on writes. Nothing in here can fail from the
/// caller's point of view.
pub struct CacheManager {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    tiers: Mutex<Tiers>,
}

impl CacheManager {
    /// Create a new manager using the wall clock
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager with an injected clock
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "CacheManager initialized with sizes: emb={}, resp={}, handle={}, gen={}",
            config.embedding.max_entries,
            config.response.max_entries,
            config.handle.max_entries,
            config.general.max_entries
        );

        let tiers = Tiers {
            embedding: Tier::new(TierKind::Embedding, config.embedding.clone()),
            response: Tier::new(TierKind::Response, config.response.clone()),
            handle: Tier::new(TierKind::Handle, config.handle.clone()),
            general: Tier::new(TierKind::General, config.general.clone()),
        };

        Self {
            config,
            clock,
            tiers: Mutex::new(tiers),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// A panic while holding the lock cannot leave a tier half-updated in a
    /// way that matters for a cache, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Tiers> {
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get cached embedding for text
    pub fn get_embedding(&self, text: &str) -> Option<Vec<f32>> {
        let now = self.clock.now();
        self.lock()
            .embedding
            .get_if(&content_key(text), now, |hit| hit.source == text)
            .map(|hit| hit.value)
    }

    /// Cache embedding for text
    pub fn set_embedding(&self, text: &str, embedding: Vec<f32>) {
        let now = self.clock.now();
        self.lock()
            .embedding
            .set(content_key(text), Digested::new(text, embedding), None, now);
    }

    /// Get cached generated answer for a prompt
    pub fn get_response(&self, prompt: &str) -> Option<String> {
        let now = self.clock.now();
        self.lock()
            .response
            .get_if(&content_key(prompt), now, |hit| hit.source == prompt)
            .map(|hit| hit.value)
    }

    /// Cache generated answer for a prompt
    pub fn set_response(&self, prompt: &str, response: impl Into<String>) {
        let now = self.clock.now();
        self.lock()
            .response
            .set(content_key(prompt), Digested::new(prompt, response.into()), None, now);
    }

    /// Get a shared handle by name, downcast to its concrete type
    pub fn get_handle<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let now = self.clock.now();
        let handle = self.lock().handle.get(name, now)?;

        match handle.downcast::<T>() {
            Ok(handle) => Some(handle),
            Err(_) => {
                warn!("Cached handle '{}' has an unexpected type", name);
                None
            }
        }
    }

    /// Cache a shared handle by name
    pub fn set_handle<T: Any + Send + Sync>(&self, name: &str, handle: Arc<T>) {
        let now = self.clock.now();
        let handle: SharedHandle = handle;
        self.lock().handle.set(name.to_string(), handle, None, now);
    }

    /// Get a raw JSON value from the general tier
    pub fn get_value(&self, key: &str, namespace: &str) -> Option<serde_json::Value> {
        let now = self.clock.now();
        self.lock().general.get(&namespaced_key(namespace, key), now)
    }

    /// Store a raw JSON value in the general tier
    pub fn set_value(
        &self,
        key: &str,
        namespace: &str,
        value: serde_json::Value,
        ttl: Option<Duration>,
    ) {
        let now = self.clock.now();
        self.lock()
            .general
            .set(namespaced_key(namespace, key), value, ttl, now);
    }

    /// Get a typed value from the general tier.
    ///
    /// A stored value that no longer deserializes as `T` is reported as a miss.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str, namespace: &str) -> Option<T> {
        let value = self.get_value(key, namespace)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(
                    "Discarding cached value {}: {}",
                    namespaced_key(namespace, key),
                    e
                );
                None
            }
        }
    }

    /// Store a typed value in the general tier.
    ///
    /// Values that cannot be serialized are skipped with a warning.
    pub fn set_json<T: Serialize>(&self, key: &str, namespace: &str, value: &T, ttl: Option<Duration>) {
        match to_value(value) {
            Ok(json) => self.set_value(key, namespace, json, ttl),
            Err(e) => warn!(
                "Not caching {}: {}",
                namespaced_key(namespace, key),
                e
            ),
        }
    }

    /// Clear entries whose key contains `pattern` across all tiers.
    /// `"*"` clears everything. Returns the number of entries removed.
    pub fn clear(&self, pattern: &str) -> usize {
        let mut tiers = self.lock();
        let removed = tiers.embedding.remove_matching(pattern)
            + tiers.response.remove_matching(pattern)
            + tiers.handle.remove_matching(pattern)
            + tiers.general.remove_matching(pattern);

        if pattern == "*" {
            info!("All caches cleared ({} entries)", removed);
        } else {
            info!("Cleared {} entries matching '{}'", removed, pattern);
        }
        removed
    }

    /// Remove all expired entries from every tier
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        self.lock().purge_expired(now)
    }

    /// Number of entries currently held by one tier
    pub fn len(&self, kind: TierKind) -> usize {
        self.lock().len(kind)
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let tiers = self.lock();
        CacheStats::from_tiers(vec![
            tiers.embedding.stats(),
            tiers.response.stats(),
            tiers.handle.stats(),
            tiers.general.stats(),
        ])
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Spawn the periodic sweep of expired entries.
///
/// Each sweep takes the lock once; gets and sets wait at most for one purge
/// pass. Abort the returned handle to stop the task.
pub fn spawn_cleanup_task(cache: Arc<CacheManager>) -> JoinHandle<()> {
    let interval = cache.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let cleaned = cache.cleanup_expired();
            if cleaned > 0 {
                debug!("Cleaned {} expired cache entries", cleaned);
            }
        }
    })
}

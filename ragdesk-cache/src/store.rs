//! Single-tier storage with lazy TTL expiration and LRU eviction

use crate::config::TierConfig;
use crate::entry::CacheEntry;
use crate::types::{CacheKey, TierCounters, TierKind, TierStats};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// One cache tier: a bounded `key -> entry` map
///
/// A tier is not synchronized on its own; [`crate::CacheManager`] keeps all
/// tiers behind one lock.
///
/// Invariant: `len() <= config.max_entries` after every `set`.
#[derive(Debug)]
pub struct Tier<V> {
    kind: TierKind,
    config: TierConfig,
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Source of recency stamps, bumped on every write and hit
    tick: u64,
    counters: TierCounters,
}

impl<V: Clone> Tier<V> {
    pub fn new(kind: TierKind, config: TierConfig) -> Self {
        Self {
            kind,
            config,
            entries: HashMap::new(),
            tick: 0,
            counters: TierCounters::default(),
        }
    }

    pub fn kind(&self) -> TierKind {
        self.kind
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn counters(&self) -> TierCounters {
        self.counters
    }

    /// Look up a live entry.
    ///
    /// A hit bumps the entry's access metadata. An expired entry is removed
    /// and reported as a miss.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        self.get_if(key, now, |_| true)
    }

    /// Like [`Tier::get`], but a live entry rejected by `accept` is reported
    /// as a miss and left in place for the next write to replace.
    pub fn get_if(
        &mut self,
        key: &str,
        now: DateTime<Utc>,
        accept: impl FnOnce(&V) -> bool,
    ) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.counters.misses += 1;
                debug!("Cache miss ({}): {}", self.kind, key);
                return None;
            }
        };

        if expired {
            self.entries.remove(key);
            self.counters.misses += 1;
            self.counters.evictions_ttl += 1;
            debug!("Cache entry expired ({}): {}", self.kind, key);
            return None;
        }

        if !self.entries.get(key).is_some_and(|entry| accept(&entry.value)) {
            self.counters.misses += 1;
            debug!("Cache entry rejected ({}): {}", self.kind, key);
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        let value = self
            .entries
            .get_mut(key)
            .map(|entry| entry.access(now, tick).clone());

        if value.is_some() {
            self.counters.hits += 1;
            debug!("Cache hit ({}): {}", self.kind, key);
        }
        value
    }

    /// Insert or overwrite an entry.
    ///
    /// Expired entries are purged first, then least-recently-accessed entries
    /// are evicted until the tier is back within capacity. Returns the number
    /// of entries evicted for capacity.
    pub fn set(&mut self, key: CacheKey, value: V, ttl: Option<Duration>, now: DateTime<Utc>) -> usize {
        self.purge_expired(now);

        let ttl = ttl.unwrap_or_else(|| self.config.ttl_with_jitter());
        self.tick += 1;
        let mut entry = CacheEntry::new(value, ttl, now);
        entry.recency = self.tick;

        if self.entries.insert(key.clone(), entry).is_some() {
            debug!("Updated cache entry ({}): {}", self.kind, key);
        } else {
            debug!("Inserted cache entry ({}): {}", self.kind, key);
        }

        self.evict_lru()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();

        if removed > 0 {
            self.counters.evictions_ttl += removed as u64;
            debug!("Purged {} expired entries from {} tier", removed, self.kind);
        }
        removed
    }

    /// Remove keys containing `pattern` (`"*"` removes everything)
    pub fn remove_matching(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        if pattern == "*" {
            self.entries.clear();
        } else {
            self.entries.retain(|key, _| !key.contains(pattern));
        }
        before - self.entries.len()
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Check if a key is present (expired or not) without touching recency
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> TierStats {
        TierStats {
            tier: self.kind,
            size: self.entries.len(),
            max_entries: self.config.max_entries,
            ttl_seconds: self.config.ttl.as_secs(),
            counters: self.counters,
        }
    }

    fn evict_lru(&mut self) -> usize {
        let mut evicted = 0;

        while self.entries.len() > self.config.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.recency)
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    debug!("Evicting entry due to max_entries limit ({}): {}", self.kind, key);
                    self.entries.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        self.counters.evictions_lru += evicted as u64;
        evicted
    }
}

//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key type
pub type CacheKey = String;

/// One category of cached data. Each tier owns its own map, capacity and TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Embedding vectors, keyed by a hash of the embedded text
    Embedding,

    /// Generated answers, keyed by a hash of the prompt
    Response,

    /// Long-lived provider handles, keyed by name
    Handle,

    /// General-purpose namespaced values
    General,
}

impl TierKind {
    /// All tiers in a fixed order
    pub const ALL: [TierKind; 4] = [
        TierKind::Embedding,
        TierKind::Response,
        TierKind::Handle,
        TierKind::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierKind::Embedding => "embedding",
            TierKind::Response => "response",
            TierKind::Handle => "handle",
            TierKind::General => "general",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running counters kept by a single tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounters {
    /// Lookups that returned a live entry
    pub hits: u64,

    /// Lookups that found nothing or an expired entry
    pub misses: u64,

    /// Entries removed to bring the tier back under capacity
    pub evictions_lru: u64,

    /// Entries removed because their TTL elapsed
    pub evictions_ttl: u64,
}

/// Point-in-time view of one tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: TierKind,
    pub size: usize,
    pub max_entries: usize,
    pub ttl_seconds: u64,
    pub counters: TierCounters,
}

/// Statistics snapshot across every tier of a manager
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Per-tier breakdown, in [`TierKind::ALL`] order
    pub tiers: Vec<TierStats>,

    /// Number of entries currently cached across all tiers
    pub total_entries: usize,

    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of evictions due to capacity limits
    pub evictions_lru: u64,

    /// Number of removals due to TTL expiration
    pub evictions_ttl: u64,
}

impl CacheStats {
    /// Build a snapshot from per-tier stats
    pub fn from_tiers(tiers: Vec<TierStats>) -> Self {
        let mut stats = CacheStats::default();
        for tier in &tiers {
            stats.total_entries += tier.size;
            stats.hits += tier.counters.hits;
            stats.misses += tier.counters.misses;
            stats.evictions_lru += tier.counters.evictions_lru;
            stats.evictions_ttl += tier.counters.evictions_ttl;
        }
        stats.tiers = tiers;
        stats
    }

    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_lru + self.evictions_ttl
    }

    /// Look up a single tier's stats
    pub fn tier(&self, kind: TierKind) -> Option<&TierStats> {
        self.tiers.iter().find(|t| t.tier == kind)
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.total_entries,
            self.total_evictions()
        )
    }
}

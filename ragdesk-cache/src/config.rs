//! Configuration for the cache system

use crate::error::{CacheError, Result};
use crate::types::TierKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capacity and expiration settings for a single tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Maximum number of entries kept after any write completes
    pub max_entries: usize,

    /// Default time-to-live for entries written without an explicit TTL
    pub ttl: Duration,

    /// TTL jitter factor (0.0 - 1.0)
    /// Adds random variation so entries written together do not expire together.
    /// Zero keeps expiration exact.
    pub ttl_jitter: f64,
}

impl TierConfig {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            ttl_jitter: 0.0,
        }
    }

    /// Create a new builder for tier configuration
    pub fn builder() -> TierConfigBuilder {
        TierConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(CacheError::ConfigError(
                "max_entries must be greater than 0".to_string(),
            ));
        }

        if self.ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "ttl must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.ttl;
        }

        let base_secs = self.ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

/// Builder for tier configuration
#[derive(Debug, Default)]
pub struct TierConfigBuilder {
    max_entries: Option<usize>,
    ttl: Option<Duration>,
    ttl_jitter: Option<f64>,
}

impl TierConfigBuilder {
    /// Set maximum number of entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set default TTL
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    pub fn build(self) -> TierConfig {
        let defaults = CacheConfig::default().general;

        TierConfig {
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
        }
    }
}

/// Configuration for the whole cache manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub embedding: TierConfig,
    pub response: TierConfig,
    pub handle: TierConfig,
    pub general: TierConfig,

    /// Enable the periodic background sweep of expired entries
    pub enable_auto_cleanup: bool,

    /// Interval between background sweeps
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // Embeddings are stable: 1 hour
            embedding: TierConfig::new(1_000, Duration::from_secs(3600)),
            // Generated answers: 5 minutes
            response: TierConfig::new(500, Duration::from_secs(300)),
            // Provider handles: 10 minutes
            handle: TierConfig::new(10, Duration::from_secs(600)),
            // General purpose: 5 minutes
            general: TierConfig::new(100, Duration::from_secs(300)),
            enable_auto_cleanup: true,
            // Cleanup every 5 minutes
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Settings for one tier
    pub fn tier(&self, kind: TierKind) -> &TierConfig {
        match kind {
            TierKind::Embedding => &self.embedding,
            TierKind::Response => &self.response,
            TierKind::Handle => &self.handle,
            TierKind::General => &self.general,
        }
    }

    fn tier_mut(&mut self, kind: TierKind) -> &mut TierConfig {
        match kind {
            TierKind::Embedding => &mut self.embedding,
            TierKind::Response => &mut self.response,
            TierKind::Handle => &mut self.handle,
            TierKind::General => &mut self.general,
        }
    }

    /// Validate every tier and the sweep interval
    pub fn validate(&self) -> Result<()> {
        for kind in TierKind::ALL {
            self.tier(kind)
                .validate()
                .map_err(|e| CacheError::ConfigError(format!("{} tier: {}", kind, e)))?;
        }

        if self.enable_auto_cleanup && self.cleanup_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration for memory-constrained environments
    pub fn small() -> Self {
        Self {
            embedding: TierConfig::new(200, Duration::from_secs(1800)),
            response: TierConfig::new(100, Duration::from_secs(300)),
            handle: TierConfig::new(4, Duration::from_secs(600)),
            general: TierConfig::new(50, Duration::from_secs(300)),
            ..Default::default()
        }
    }

    /// Configuration for busy deployments with many distinct questions
    pub fn large() -> Self {
        Self {
            embedding: TierConfig::new(20_000, Duration::from_secs(7200)),
            response: TierConfig::new(5_000, Duration::from_secs(600)),
            handle: TierConfig::new(32, Duration::from_secs(1800)),
            general: TierConfig::new(2_000, Duration::from_secs(300)),
            ..Default::default()
        }
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    tiers: Vec<(TierKind, TierConfig)>,
    enable_auto_cleanup: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Replace the settings of one tier
    pub fn tier(mut self, kind: TierKind, config: TierConfig) -> Self {
        self.tiers.push((kind, config));
        self
    }

    /// Set only the capacity of one tier, keeping its default TTL
    pub fn max_entries(self, kind: TierKind, max: usize) -> Self {
        let mut config = CacheConfig::default().tier(kind).clone();
        config.max_entries = max;
        self.tier(kind, config)
    }

    /// Enable or disable automatic cleanup
    pub fn enable_auto_cleanup(mut self, enable: bool) -> Self {
        self.enable_auto_cleanup = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let mut config = CacheConfig::default();

        for (kind, tier) in self.tiers {
            *config.tier_mut(kind) = tier;
        }
        if let Some(enable) = self.enable_auto_cleanup {
            config.enable_auto_cleanup = enable;
        }
        if let Some(interval) = self.cleanup_interval {
            config.cleanup_interval = interval;
        }

        config
    }
}

//! Pipeline configuration
//!
//! Precedence, lowest first: built-in defaults, an optional YAML file, then
//! `RAGDESK_*` environment variables.

use ragdesk_cache::{CacheConfig, TierConfig, TierKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::context::ContextConfig;
use crate::decision::DecisionConfig;
use crate::error::ConfigError;
use crate::generation::GenerationConfig;
use crate::retrieval::RetrievalConfig;

const ENV_PREFIX: &str = "RAGDESK_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub embedding: TierSettings,
    pub response: TierSettings,
    pub handle: TierSettings,
    pub general: TierSettings,
    pub enable_auto_cleanup: bool,
    pub cleanup_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        let tier = |kind: TierKind| {
            let config = defaults.tier(kind);
            TierSettings {
                max_entries: config.max_entries,
                ttl_secs: config.ttl.as_secs(),
            }
        };

        Self {
            embedding: tier(TierKind::Embedding),
            response: tier(TierKind::Response),
            handle: tier(TierKind::Handle),
            general: tier(TierKind::General),
            enable_auto_cleanup: defaults.enable_auto_cleanup,
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
        }
    }
}

impl CacheSettings {
    fn tier_mut(&mut self, kind: TierKind) -> &mut TierSettings {
        match kind {
            TierKind::Embedding => &mut self.embedding,
            TierKind::Response => &mut self.response,
            TierKind::Handle => &mut self.handle,
            TierKind::General => &mut self.general,
        }
    }

    fn tier(&self, kind: TierKind) -> &TierSettings {
        match kind {
            TierKind::Embedding => &self.embedding,
            TierKind::Response => &self.response,
            TierKind::Handle => &self.handle,
            TierKind::General => &self.general,
        }
    }

    /// Convert into the cache crate's configuration
    pub fn to_cache_config(&self) -> CacheConfig {
        let mut builder = CacheConfig::builder()
            .enable_auto_cleanup(self.enable_auto_cleanup)
            .cleanup_interval(Duration::from_secs(self.cleanup_interval_secs));

        for kind in TierKind::ALL {
            let settings = self.tier(kind);
            builder = builder.tier(
                kind,
                TierConfig::builder()
                    .max_entries(settings.max_entries)
                    .ttl(Duration::from_secs(settings.ttl_secs))
                    .build(),
            );
        }

        builder.build()
    }
}

/// Complete configuration of the answer pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheSettings,
    pub retrieval: RetrievalConfig,
    pub context: ContextConfig,
    pub decision: DecisionConfig,
    pub generation: GenerationConfig,
}

impl PipelineConfig {
    /// Defaults, then `path` if given, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Override fields from flat `RAGDESK_*` variables resolved by `lookup`
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        for kind in TierKind::ALL {
            let upper = kind.as_str().to_uppercase();
            if let Some((key, value)) = var(&format!("CACHE_SIZE_{}", upper)) {
                self.cache.tier_mut(kind).max_entries = parse(&key, &value)?;
            }
            if let Some((key, value)) = var(&format!("CACHE_TTL_{}", upper)) {
                self.cache.tier_mut(kind).ttl_secs = parse(&key, &value)?;
            }
        }
        if let Some((key, value)) = var("CACHE_CLEANUP_INTERVAL") {
            self.cache.cleanup_interval_secs = parse(&key, &value)?;
        }

        if let Some((key, value)) = var("RETRIEVAL_TIMEOUT_SEMANTIC") {
            self.retrieval.timeout_semantic_secs = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("RETRIEVAL_TIMEOUT_FAQ") {
            self.retrieval.timeout_faq_secs = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("COMPLEXITY_THRESHOLD") {
            self.retrieval.complexity_threshold = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_RETRIEVAL_WORKERS") {
            self.retrieval.max_retrieval_workers = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("ENABLE_PARALLEL") {
            self.retrieval.enable_parallel = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("RETRIEVAL_CACHE_TTL") {
            self.retrieval.result_cache_ttl_secs = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("VECTOR_K") {
            self.retrieval.vector_k = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("FAQ_K") {
            self.retrieval.faq_k = parse(&key, &value)?;
        }

        if let Some((key, value)) = var("MAX_CONTEXT_CHARS") {
            self.context.max_context_chars = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("MIN_CHARS_FAQ") {
            self.context.min_chars_faq = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("MIN_CHARS_DOCS") {
            self.context.min_chars_docs = parse(&key, &value)?;
        }

        if let Some((key, value)) = var("HANDOFF_CONFIDENCE_THRESHOLD") {
            self.decision.handoff_confidence_threshold = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("MAX_SOURCES_CITED") {
            self.decision.max_sources_cited = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("CONFIDENCE_WEIGHT_DOCS") {
            self.decision.weights.docs = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("CONFIDENCE_WEIGHT_FAQ") {
            self.decision.weights.faq = parse(&key, &value)?;
        }

        if let Some((key, value)) = var("MIN_ANSWER_LENGTH") {
            self.generation.min_answer_length = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("GENERATION_TIMEOUT") {
            self.generation.timeout_secs = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("CACHE_RESPONSES") {
            self.generation.cache_responses = parse_bool(&key, &value)?;
        }

        Ok(())
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.to_cache_config().validate()?;

        let retrieval = &self.retrieval;
        for (key, secs) in [
            ("retrieval.timeout_semantic_secs", retrieval.timeout_semantic_secs),
            ("retrieval.timeout_faq_secs", retrieval.timeout_faq_secs),
            ("generation.timeout_secs", self.generation.timeout_secs),
        ] {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(invalid(key, secs));
            }
        }
        if retrieval.max_retrieval_workers == 0 {
            return Err(invalid("retrieval.max_retrieval_workers", 0));
        }
        if retrieval.result_cache_ttl_secs == 0 {
            return Err(invalid("retrieval.result_cache_ttl_secs", 0));
        }

        let context = &self.context;
        if context.max_context_chars == 0 {
            return Err(invalid("context.max_context_chars", 0));
        }
        if !(0.0..=1.0).contains(&context.floor_fraction) {
            return Err(invalid("context.floor_fraction", context.floor_fraction));
        }

        let decision = &self.decision;
        if !(0.0..=1.0).contains(&decision.handoff_confidence_threshold) {
            return Err(invalid(
                "decision.handoff_confidence_threshold",
                decision.handoff_confidence_threshold,
            ));
        }
        for (key, weight) in [
            ("decision.weights.docs", decision.weights.docs),
            ("decision.weights.faq", decision.weights.faq),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(invalid(key, weight));
            }
        }

        debug!("Configuration validated");
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.to_cache_config()
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

//! # ragdesk-cache
//!
//! Process-wide, in-memory cache for the ragdesk answer pipeline.
//!
//! ## Features
//!
//! - Four independent tiers (embeddings, generated answers, provider handles,
//!   general values), each with its own capacity and default TTL
//! - Lazy TTL expiration on read plus an optional background sweep
//! - LRU eviction by last access once a tier exceeds its capacity
//! - Hit, miss and eviction counters per tier
//! - Injectable [`Clock`] so expiry can be tested without sleeping
//!
//! ## Example
//!
//! ```rust
//! use ragdesk_cache::{CacheConfig, CacheManager, TierKind};
//! use std::time::Duration;
//!
//! let config = CacheConfig::builder()
//!     .max_entries(TierKind::General, 1_000)
//!     .build();
//!
//! let cache = CacheManager::new(config);
//!
//! cache.set_json("faq:fees", "retrieval", &vec!["Q: fees?"], Some(Duration::from_secs(300)));
//!
//! let cached: Option<Vec<String>> = cache.get_json("faq:fees", "retrieval");
//! assert_eq!(cached, Some(vec!["Q: fees?".to_string()]));
//!
//! cache.set_response("prompt", "answer");
//! assert_eq!(cache.get_response("prompt").as_deref(), Some("answer"));
//!
//! println!("{}", cache.stats());
//! ```
//!
//! ## Background cleanup
//!
//! ```no_run
//! use ragdesk_cache::{spawn_cleanup_task, CacheConfig, CacheManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(CacheManager::new(CacheConfig::default()));
//!     let sweeper = spawn_cleanup_task(cache.clone());
//!
//!     // ... serve requests ...
//!
//!     sweeper.abort();
//! }
//! ```

pub mod clock;
pub mod config;
pub mod entry;
pub mod error;
pub mod keys;
pub mod manager;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheConfigBuilder, TierConfig, TierConfigBuilder};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use keys::{content_key, namespaced_key};
pub use manager::{spawn_cleanup_task, CacheManager, SharedHandle};
pub use store::Tier;
pub use types::{CacheKey, CacheStats, TierCounters, TierKind, TierStats};

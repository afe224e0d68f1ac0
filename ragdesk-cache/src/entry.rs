//! Cache entry management with TTL support

use chrono::{DateTime, Utc};
use std::time::Duration;

/// A cached value with its expiration and access metadata
///
/// Entries are owned by exactly one tier and only mutated through that
/// tier's `get` and `set`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,

    /// Time-to-live measured from `created_at`
    pub ttl: Duration,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// Number of hits served by this entry
    pub access_count: u64,

    /// Last hit (or creation) time
    pub last_accessed: DateTime<Utc>,

    /// Monotonic recency stamp used for LRU ordering.
    /// Timestamps can tie under a coarse or manual clock; this cannot.
    pub(crate) recency: u64,
}

impl<V> CacheEntry<V> {
    /// Create a new entry written at `now`
    pub fn new(value: V, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            value,
            ttl,
            created_at: now,
            access_count: 0,
            last_accessed: now,
            recency: 0,
        }
    }

    /// Age of the entry at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// An entry is expired once its age strictly exceeds its TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.ttl.checked_sub(self.age(now))
    }

    /// Record a hit and return the value
    pub fn access(&mut self, now: DateTime<Utc>, recency: u64) -> &V {
        self.access_count += 1;
        self.last_accessed = now;
        self.recency = recency;
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_creation() {
        let now = Utc::now();
        let entry = CacheEntry::new("value".to_string(), Duration::from_secs(3600), now);

        assert_eq!(entry.value, "value");
        assert_eq!(entry.access_count, 0);
        assert_eq!(entry.last_accessed, now);
        assert!(!entry.is_expired(now));
    }

    #[test]
    fn test_entry_expiration_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new(1u8, Duration::from_secs(10), now);

        assert!(!entry.is_expired(now + chrono::Duration::seconds(10)));
        assert!(entry.is_expired(now + chrono::Duration::milliseconds(10_001)));
    }

    #[test]
    fn test_access_updates_metadata() {
        let now = Utc::now();
        let mut entry = CacheEntry::new(7u32, Duration::from_secs(60), now);

        let later = now + chrono::Duration::seconds(5);
        assert_eq!(*entry.access(later, 3), 7);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.last_accessed, later);
        assert_eq!(entry.recency, 3);
        // access does not extend the lifetime
        assert_eq!(entry.created_at, now);
    }

    #[test]
    fn test_time_until_expiration() {
        let now = Utc::now();
        let entry = CacheEntry::new((), Duration::from_secs(60), now);

        let left = entry.time_until_expiration(now + chrono::Duration::seconds(20));
        assert_eq!(left, Some(Duration::from_secs(40)));

        assert!(entry
            .time_until_expiration(now + chrono::Duration::seconds(61))
            .is_none());
    }

    #[test]
    fn test_age_before_creation_is_zero() {
        let now = Utc::now();
        let entry = CacheEntry::new((), Duration::from_secs(1), now);
        assert_eq!(entry.age(now - chrono::Duration::seconds(5)), Duration::ZERO);
    }
}

use proptest::prelude::*;
use ragdesk_cache::{CacheConfig, CacheManager, ManualClock, TierConfig, TierKind};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Set(u8),
    Get(u8),
    Advance(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u8>().prop_map(Op::Set),
        any::<u8>().prop_map(Op::Get),
        (0u16..120).prop_map(Op::Advance),
    ]
}

fn cache(max_entries: usize, ttl_secs: u64) -> (CacheManager, Arc<ManualClock>) {
    let config = CacheConfig::builder()
        .tier(
            TierKind::General,
            TierConfig::new(max_entries, Duration::from_secs(ttl_secs)),
        )
        .build();
    let clock = Arc::new(ManualClock::new());
    (CacheManager::with_clock(config, clock.clone()), clock)
}

proptest! {
    #[test]
    fn size_never_exceeds_capacity(max in 1usize..16, ops in prop::collection::vec(op(), 0..200)) {
        let (cache, clock) = cache(max, 60);
        for op in ops {
            match op {
                Op::Set(k) => cache.set_json(&k.to_string(), "p", &k, None),
                Op::Get(k) => { let _ = cache.get_json::<u8>(&k.to_string(), "p"); }
                Op::Advance(s) => clock.advance(Duration::from_secs(s as u64)),
            }
            prop_assert!(cache.len(TierKind::General) <= max);
        }
    }

    #[test]
    fn expired_entries_are_never_returned(ttl in 1u64..100, wait in 0u64..200) {
        let (cache, clock) = cache(8, ttl);
        cache.set_json("k", "p", &1u8, None);
        clock.advance(Duration::from_secs(wait));

        let got = cache.get_json::<u8>("k", "p");
        if wait > ttl {
            prop_assert!(got.is_none());
        } else {
            prop_assert_eq!(got, Some(1));
        }
    }

    #[test]
    fn hits_plus_misses_equals_lookups(ops in prop::collection::vec(op(), 0..200)) {
        let (cache, clock) = cache(4, 30);
        let mut lookups = 0u64;
        for op in ops {
            match op {
                Op::Set(k) => cache.set_json(&k.to_string(), "p", &k, None),
                Op::Get(k) => {
                    lookups += 1;
                    let _ = cache.get_json::<u8>(&k.to_string(), "p");
                }
                Op::Advance(s) => clock.advance(Duration::from_secs(s as u64)),
            }
        }
        let stats = cache.stats();
        prop_assert_eq!(stats.hits + stats.misses, lookups);
    }

    #[test]
    fn most_recent_write_survives(max in 1usize..8, keys in prop::collection::vec(any::<u8>(), 1..50)) {
        let (cache, _) = cache(max, 60);
        for k in &keys {
            cache.set_json(&k.to_string(), "p", k, None);
        }
        let last = keys[keys.len() - 1];
        prop_assert_eq!(cache.get_json::<u8>(&last.to_string(), "p"), Some(last));
    }
}

//! Criterion benchmarks for the cache manager hot paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ragdesk_cache::{CacheConfig, CacheManager, TierConfig, TierKind};
use std::time::Duration;

fn bench_response_hit(c: &mut Criterion) {
    let cache = CacheManager::new(CacheConfig::default());
    cache.set_response("what are the fees?", "The monthly fee is zero.");

    c.bench_function("response_get_hit", |b| {
        b.iter(|| cache.get_response(black_box("what are the fees?")))
    });
}

fn bench_json_round_trip(c: &mut Criterion) {
    let cache = CacheManager::new(CacheConfig::default());
    let items: Vec<String> = (0..5).map(|i| format!("Q: question {i}\nA: answer {i}")).collect();

    c.bench_function("general_set_get_json", |b| {
        b.iter(|| {
            cache.set_json("faq:fees", "retrieval", &items, None);
            cache.get_json::<Vec<String>>(black_box("faq:fees"), "retrieval")
        })
    });
}

fn bench_set_at_capacity(c: &mut Criterion) {
    let config = CacheConfig::builder()
        .tier(TierKind::Embedding, TierConfig::new(1_000, Duration::from_secs(3600)))
        .build();
    let cache = CacheManager::new(config);
    for i in 0..1_000 {
        cache.set_embedding(&format!("warm {i}"), vec![0.0; 16]);
    }

    let mut n = 0u64;
    c.bench_function("embedding_set_with_eviction", |b| {
        b.iter(|| {
            n += 1;
            cache.set_embedding(&format!("new {n}"), vec![0.0; 16]);
        })
    });
}

criterion_group!(benches, bench_response_hit, bench_json_round_trip, bench_set_at_capacity);
criterion_main!(benches);

//! 响应缓存模块集成测试
//!
//! 验证新鲜/陈旧/未命中三态、创建序淘汰与过期清扫。

use std::time::{Duration, Instant};
use steward::cache::{CacheOutcome, ResponseCache};
use steward::config::CacheLayerConfig;

fn cache_with(max_age_ms: u64, swr_ms: u64, max_entries: usize) -> ResponseCache<String> {
    ResponseCache::new(CacheLayerConfig {
        max_age_ms,
        stale_while_revalidate_ms: swr_ms,
        max_entries,
    })
}

#[tokio::test]
async fn test_three_state_lookup_over_entry_lifetime() {
    // max_age 五分钟，陈旧容忍二十四小时
    let cache = cache_with(300_000, 86_400_000, 100);
    let t0 = Instant::now();

    cache.put_at("GET /users", "body".to_string(), t0);

    assert!(matches!(
        cache.get_at("GET /users", t0 + Duration::from_millis(200_000)),
        CacheOutcome::Fresh(_)
    ));
    assert!(matches!(
        cache.get_at("GET /users", t0 + Duration::from_millis(350_000)),
        CacheOutcome::Stale(_)
    ));
    assert!(matches!(
        cache.get_at("GET /users", t0 + Duration::from_millis(90_000_000)),
        CacheOutcome::Miss
    ));
}

#[tokio::test]
async fn test_eviction_removes_exactly_the_oldest() {
    let cache = cache_with(300_000, 86_400_000, 3);
    let t0 = Instant::now();

    cache.put_at("a", "1".to_string(), t0);
    cache.put_at("b", "2".to_string(), t0 + Duration::from_millis(10));
    cache.put_at("c", "3".to_string(), t0 + Duration::from_millis(20));

    // 第四条写入触发单条淘汰，牺牲者是创建最早的 a
    cache.put_at("d", "4".to_string(), t0 + Duration::from_millis(30));
    assert_eq!(cache.len(), 3);
    assert!(matches!(
        cache.get_at("a", t0 + Duration::from_millis(40)),
        CacheOutcome::Miss
    ));
    assert!(cache.get_at("b", t0 + Duration::from_millis(40)).is_usable());
}

#[tokio::test]
async fn test_replacement_refreshes_creation_order() {
    let cache = cache_with(300_000, 86_400_000, 2);
    let t0 = Instant::now();

    cache.put_at("a", "1".to_string(), t0);
    cache.put_at("b", "2".to_string(), t0 + Duration::from_millis(10));
    // 整体替换 a，使其成为最年轻的条目
    cache.put_at("a", "1v2".to_string(), t0 + Duration::from_millis(20));

    cache.put_at("c", "3".to_string(), t0 + Duration::from_millis(30));
    assert!(matches!(
        cache.get_at("b", t0 + Duration::from_millis(40)),
        CacheOutcome::Miss
    ));
    match cache.get_at("a", t0 + Duration::from_millis(40)) {
        CacheOutcome::Fresh(v) => assert_eq!(v, "1v2"),
        other => panic!("期望 Fresh，实际 {:?}", other),
    }
}

#[tokio::test]
async fn test_sweep_drops_entries_past_stale_horizon() {
    let cache = cache_with(100, 100, 10);
    let t0 = Instant::now();

    cache.put_at("old", "1".to_string(), t0);
    cache.put_at("young", "2".to_string(), t0 + Duration::from_millis(150));

    let swept = cache.sweep_expired_at(t0 + Duration::from_millis(250));
    assert_eq!(swept, 1);
    assert_eq!(cache.len(), 1);
    assert!(cache
        .get_at("young", t0 + Duration::from_millis(250))
        .is_usable());
}

#[tokio::test]
async fn test_stats_track_hit_classes() {
    let cache = cache_with(100, 100, 10);
    let t0 = Instant::now();

    cache.put_at("k", "v".to_string(), t0);
    cache.get_at("k", t0 + Duration::from_millis(50));
    cache.get_at("k", t0 + Duration::from_millis(150));
    cache.get_at("absent", t0);

    assert_eq!(cache.stats().fresh_hits(), 1);
    assert_eq!(cache.stats().stale_hits(), 1);
    assert_eq!(cache.stats().misses(), 1);
}

//! 限流器模块集成测试
//!
//! 验证固定窗口裁决在多身份、多分类下的隔离与窗口翻转行为。

use std::time::{Duration, Instant};
use steward::config::{Classification, RateLimitingConfig, RateRule};
use steward::error::AdmissionDecision;
use steward::rate_limiter::RateLimiter;

fn limiter_with_api_rule(window_ms: u64, max: u64) -> RateLimiter {
    let mut config = RateLimitingConfig::default();
    config.api = RateRule { window_ms, max };
    RateLimiter::new(config)
}

#[tokio::test]
async fn test_identities_do_not_share_windows() {
    let limiter = limiter_with_api_rule(60_000, 2);

    for _ in 0..2 {
        assert!(limiter.admit("10.0.0.1", Classification::Api).is_admitted());
        assert!(limiter.admit("10.0.0.2", Classification::Api).is_admitted());
    }

    // 各自的上限独立触顶
    assert!(!limiter.admit("10.0.0.1", Classification::Api).is_admitted());
    assert!(!limiter.admit("10.0.0.2", Classification::Api).is_admitted());
}

#[tokio::test]
async fn test_classifications_do_not_share_windows() {
    let mut config = RateLimitingConfig::default();
    config.auth = RateRule {
        window_ms: 60_000,
        max: 1,
    };
    config.api = RateRule {
        window_ms: 60_000,
        max: 1,
    };
    let limiter = RateLimiter::new(config);

    assert!(limiter.admit("user-1", Classification::Auth).is_admitted());
    // 同一身份在另一分类下仍有独立额度
    assert!(limiter.admit("user-1", Classification::Api).is_admitted());
    assert!(!limiter.admit("user-1", Classification::Auth).is_admitted());
}

#[tokio::test]
async fn test_window_rollover_resets_count() {
    let limiter = limiter_with_api_rule(1_000, 1);
    let start = Instant::now();

    assert!(limiter
        .admit_at("10.0.0.1", Classification::Api, start)
        .is_admitted());
    assert!(!limiter
        .admit_at("10.0.0.1", Classification::Api, start + Duration::from_millis(999))
        .is_admitted());

    // 边界时刻本身仍属于旧窗口
    assert!(!limiter
        .admit_at("10.0.0.1", Classification::Api, start + Duration::from_millis(1_000))
        .is_admitted());

    // 严格越过窗口终点后首个请求开启新窗口并被准入
    assert!(limiter
        .admit_at("10.0.0.1", Classification::Api, start + Duration::from_millis(1_001))
        .is_admitted());
}

#[tokio::test]
async fn test_retry_after_points_to_window_end() {
    let limiter = limiter_with_api_rule(1_000, 1);
    let start = Instant::now();

    limiter.admit_at("10.0.0.1", Classification::Api, start);
    match limiter.admit_at(
        "10.0.0.1",
        Classification::Api,
        start + Duration::from_millis(250),
    ) {
        AdmissionDecision::Reject { retry_after } => {
            assert_eq!(retry_after, Duration::from_millis(750));
        }
        AdmissionDecision::Admit => panic!("应当被拒绝"),
    }
}

#[tokio::test]
async fn test_rejected_attempts_do_not_extend_window() {
    let limiter = limiter_with_api_rule(1_000, 1);
    let start = Instant::now();

    limiter.admit_at("10.0.0.1", Classification::Api, start);
    // 被拒绝的尝试不计数，也不推迟窗口结束
    for i in 1..5 {
        let decision = limiter.admit_at(
            "10.0.0.1",
            Classification::Api,
            start + Duration::from_millis(i * 100),
        );
        assert!(!decision.is_admitted());
    }
    assert!(limiter
        .admit_at("10.0.0.1", Classification::Api, start + Duration::from_millis(1_001))
        .is_admitted());
}

#[tokio::test]
async fn test_idle_windows_are_purged() {
    let limiter = limiter_with_api_rule(1_000, 5);
    let start = Instant::now();

    limiter.admit_at("10.0.0.1", Classification::Api, start);
    limiter.admit_at("10.0.0.2", Classification::Api, start + Duration::from_millis(1_900));
    assert_eq!(limiter.tracked_windows(), 2);

    // 闲置超过两个窗口长度的条目被清理
    let purged = limiter.purge_idle_at(start + Duration::from_millis(2_100));
    assert_eq!(purged, 1);
    assert_eq!(limiter.tracked_windows(), 1);
}

//! Rate limiter behavior against real stores.

use std::sync::Arc;
use std::time::Duration;

use content_gateway::config::schema::{CategoryLimit, RateLimitConfig};
use content_gateway::security::rate_limit::RateLimiter;
use content_gateway::security::store::MemoryStore;

mod common;
use common::FailingStore;

fn limiter_config(category: &str, max_requests: u32, window_ms: u64) -> RateLimitConfig {
    let mut config = RateLimitConfig::default();
    config.categories.insert(
        category.to_string(),
        CategoryLimit {
            max_requests,
            window_ms,
        },
    );
    config
}

#[tokio::test]
async fn test_fixed_window_admits_quota_then_denies() {
    let config = limiter_config("ai-content", 5, 60_000);
    let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), &config);

    for expected_remaining in [4u32, 3, 2, 1, 0] {
        let decision = limiter.check_limit("client-1", "ai-content").await;
        assert!(decision.allowed);
        assert_eq!(decision.limit, 5);
        assert_eq!(decision.remaining, expected_remaining);
    }

    let denied = limiter.check_limit("client-1", "ai-content").await;
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
    let retry_after = denied.retry_after.expect("denial must carry retry_after");
    assert!(retry_after <= 60);
}

#[tokio::test]
async fn test_window_reset_is_repeatable() {
    let config = limiter_config("api", 2, 80);
    let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), &config);

    for cycle in 0..3 {
        assert!(limiter.check_limit("c", "api").await.allowed, "cycle {cycle}");
        assert!(limiter.check_limit("c", "api").await.allowed, "cycle {cycle}");
        assert!(
            !limiter.check_limit("c", "api").await.allowed,
            "cycle {cycle} third call should be denied"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_store_failure_fails_open() {
    let config = limiter_config("ai-content", 1, 60_000);
    let limiter = RateLimiter::new(Arc::new(FailingStore), &config);

    // Well past the quota, still allowed: the limiter's own outage must
    // not take the platform down with it.
    for _ in 0..10 {
        let decision = limiter.check_limit("client-1", "ai-content").await;
        assert!(decision.allowed);
        assert!(decision.retry_after.is_none());
    }
}

#[tokio::test]
async fn test_categories_are_isolated() {
    let mut config = limiter_config("ai-content", 1, 60_000);
    config.categories.insert(
        "api".to_string(),
        CategoryLimit {
            max_requests: 3,
            window_ms: 60_000,
        },
    );
    let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), &config);

    assert!(limiter.check_limit("c", "ai-content").await.allowed);
    assert!(!limiter.check_limit("c", "ai-content").await.allowed);

    // Same identity, different category: separate counter.
    assert!(limiter.check_limit("c", "api").await.allowed);
}

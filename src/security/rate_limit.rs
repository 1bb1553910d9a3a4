//! Fixed-window rate limiting middleware.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::HeaderValue, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::schema::{CategoryLimit, RateLimitConfig};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::store::RateLimitStore;

/// Outcome of one quota check.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Quota for the category.
    pub limit: u32,
    /// Requests left in the current window.
    pub remaining: u32,
    /// Seconds until the window resets.
    pub reset_in: u64,
    /// Seconds the caller should wait; set only when denied.
    pub retry_after: Option<u64>,
}

/// Per-category status for the observability endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryStatus {
    pub category: String,
    pub max_requests: u32,
    pub window_ms: u64,
}

/// Maps caller identity + category onto a store key and a configured
/// quota, and decides allow/deny. Independent of providers and breakers.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    categories: HashMap<String, CategoryLimit>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            categories: config.categories.clone(),
        }
    }

    /// Count one request for `(identity, category)` and decide.
    ///
    /// Unknown categories are not limited (the category map is validated
    /// at startup; anything outside it was never meant to be metered).
    /// A store failure fails open: availability of the platform beats
    /// strict enforcement when the limiter's own backend is down.
    pub async fn check_limit(&self, identity: &str, category: &str) -> RateLimitDecision {
        let Some(limit) = self.categories.get(category) else {
            tracing::debug!(category = %category, "No quota configured for category");
            return RateLimitDecision {
                allowed: true,
                limit: 0,
                remaining: 0,
                reset_in: 0,
                retry_after: None,
            };
        };

        let key = format!("ratelimit:{}:{}", category, identity);
        let window = Duration::from_millis(limit.window_ms);

        match self.store.increment(&key, window).await {
            Ok(record) => {
                let allowed = record.count <= u64::from(limit.max_requests);
                let remaining =
                    u64::from(limit.max_requests).saturating_sub(record.count) as u32;
                let reset_in = (record.resets_in.as_millis() as u64).div_ceil(1000);
                RateLimitDecision {
                    allowed,
                    limit: limit.max_requests,
                    remaining,
                    reset_in,
                    retry_after: (!allowed).then_some(reset_in),
                }
            }
            Err(error) => {
                tracing::warn!(
                    category = %category,
                    error = %error,
                    "Rate limit store unavailable, failing open"
                );
                metrics::record_rate_limit_store_failure();
                RateLimitDecision {
                    allowed: true,
                    limit: limit.max_requests,
                    remaining: limit.max_requests,
                    reset_in: (limit.window_ms).div_ceil(1000),
                    retry_after: None,
                }
            }
        }
    }

    /// Configured categories, sorted for stable status output.
    pub fn status(&self) -> Vec<CategoryStatus> {
        let mut categories: Vec<CategoryStatus> = self
            .categories
            .iter()
            .map(|(name, limit)| CategoryStatus {
                category: name.clone(),
                max_requests: limit.max_requests,
                window_ms: limit.window_ms,
            })
            .collect();
        categories.sort_by(|a, b| a.category.cmp(&b.category));
        categories
    }
}

/// Middleware enforcing per-identity quotas on the API surface.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.limiter.as_ref() else {
        return next.run(request).await;
    };

    // Authenticated platform callers carry x-client-id; everyone else is
    // keyed by peer IP.
    let identity = request
        .headers()
        .get("x-client-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| addr.ip().to_string());
    let category = category_for_path(request.uri().path());

    let decision = limiter.check_limit(&identity, category).await;

    if decision.allowed {
        let mut response = next.run(request).await;
        apply_headers(response.headers_mut(), &decision);
        response
    } else {
        tracing::warn!(client = %identity, category = %category, "Rate limit exceeded");
        metrics::record_rate_limited(category);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate limit exceeded",
                "retry_after": decision.retry_after,
            })),
        )
            .into_response();
        apply_headers(response.headers_mut(), &decision);
        response
    }
}

fn category_for_path(path: &str) -> &'static str {
    if path.starts_with("/api/content") {
        "ai-content"
    } else {
        "api"
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert("x-ratelimit-limit", numeric_header(decision.limit as u64));
    headers.insert(
        "x-ratelimit-remaining",
        numeric_header(decision.remaining as u64),
    );
    headers.insert("x-ratelimit-reset", numeric_header(decision.reset_in));
    if let Some(retry_after) = decision.retry_after {
        headers.insert("retry-after", numeric_header(retry_after));
    }
}

fn numeric_header(value: u64) -> HeaderValue {
    // Decimal digits are always a valid header value.
    HeaderValue::from_str(&value.to_string()).expect("numeric header value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RateLimitConfig;
    use crate::security::store::MemoryStore;

    fn limiter_with(max_requests: u32, window_ms: u64) -> RateLimiter {
        let mut config = RateLimitConfig::default();
        config.categories.insert(
            "test".to_string(),
            CategoryLimit {
                max_requests,
                window_ms,
            },
        );
        RateLimiter::new(Arc::new(MemoryStore::new()), &config)
    }

    #[tokio::test]
    async fn test_remaining_counts_down_then_denies() {
        let limiter = limiter_with(5, 60_000);

        for expected_remaining in [4u32, 3, 2, 1, 0] {
            let d = limiter.check_limit("alice", "test").await;
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
            assert!(d.retry_after.is_none());
        }

        let denied = limiter.check_limit("alice", "test").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.retry_after.unwrap() <= 60);
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let limiter = limiter_with(1, 60_000);

        assert!(limiter.check_limit("alice", "test").await.allowed);
        assert!(!limiter.check_limit("alice", "test").await.allowed);
        assert!(limiter.check_limit("bob", "test").await.allowed);
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_limited() {
        let limiter = limiter_with(1, 60_000);
        for _ in 0..10 {
            assert!(limiter.check_limit("alice", "unmetered").await.allowed);
        }
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(category_for_path("/api/content/generate"), "ai-content");
        assert_eq!(category_for_path("/api/status"), "api");
    }
}

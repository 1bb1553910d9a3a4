//! Shared test utilities: scriptable providers and a failing store.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use content_gateway::config::schema::CircuitBreakerConfig;
use content_gateway::generation::provider::Provider;
use content_gateway::generation::types::{ProviderError, ProviderErrorKind};
use content_gateway::resilience::RetryPolicy;
use content_gateway::security::store::{RateLimitRecord, RateLimitStore, StoreError};

type Script = dyn Fn(u32) -> Result<String, ProviderError> + Send + Sync;

/// A provider whose outcome is scripted per call index.
pub struct MockProvider {
    id: String,
    priority: u32,
    configured: bool,
    calls: AtomicU32,
    script: Box<Script>,
}

impl MockProvider {
    pub fn new<F>(id: &str, priority: u32, script: F) -> Arc<Self>
    where
        F: Fn(u32) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            id: id.to_string(),
            priority,
            configured: true,
            calls: AtomicU32::new(0),
            script: Box::new(script),
        })
    }

    pub fn always_ok(id: &str, priority: u32, text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(id, priority, move |_| Ok(text.clone()))
    }

    pub fn always_err(id: &str, priority: u32, kind: ProviderErrorKind) -> Arc<Self> {
        let id_owned = id.to_string();
        Self::new(id, priority, move |_| {
            Err(ProviderError::new(kind, format!("{id_owned} scripted failure")))
        })
    }

    pub fn unconfigured(id: &str, priority: u32) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            priority,
            configured: false,
            calls: AtomicU32::new(0),
            script: Box::new(|_| Ok(String::new())),
        })
    }

    /// Number of times `invoke` has run.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn invoke(&self, _prompt: &str) -> Result<String, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.script)(n)
    }
}

/// Store whose every operation fails, simulating an unreachable backend.
pub struct FailingStore;

#[async_trait]
impl RateLimitStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<RateLimitRecord>, StoreError> {
        Err(StoreError::Unavailable("injected network failure".into()))
    }

    async fn increment(
        &self,
        _key: &str,
        _window: Duration,
    ) -> Result<RateLimitRecord, StoreError> {
        Err(StoreError::Unavailable("injected network failure".into()))
    }

    async fn reset(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("injected network failure".into()))
    }
}

/// Breaker config with test-sized thresholds.
pub fn breaker(failure_threshold: u32, cooldown_ms: u64) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold,
        cooldown_ms,
    }
}

/// Retry policy with millisecond delays so tests stay fast.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(8),
    }
}

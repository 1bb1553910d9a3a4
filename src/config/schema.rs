//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from config
//! files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the content gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Generation providers in failover order.
    pub providers: Vec<ProviderConfig>,

    /// Per-provider circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Breaker guarding the generation capability as a whole.
    pub global_circuit_breaker: CircuitBreakerConfig,

    /// Retry configuration for provider calls.
    pub retries: RetryConfig,

    /// Inbound rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            providers: default_providers(),
            circuit_breaker: CircuitBreakerConfig::default(),
            global_circuit_breaker: default_global_breaker(),
            retries: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Inbound request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Deadline for a single provider invocation in seconds.
    pub provider_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 60,
            provider_secs: 30,
        }
    }
}

/// One generation provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Unique provider identifier (also the breaker resource name).
    pub id: String,

    /// Failover order; lower is tried first.
    pub priority: u32,

    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Model identifier to request.
    pub model: String,
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            id: "groq".to_string(),
            priority: 1,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
        },
        ProviderConfig {
            id: "openai".to_string(),
            priority: 2,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "gpt-4o-mini".to_string(),
        },
    ]
}

/// Circuit breaker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Time the circuit stays open before admitting a probe, in
    /// milliseconds.
    pub cooldown_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_ms: 30_000,
        }
    }
}

fn default_global_breaker() -> CircuitBreakerConfig {
    // The global guard trips later and cools longer than any single
    // provider's breaker.
    CircuitBreakerConfig {
        failure_threshold: 10,
        cooldown_ms: 60_000,
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

/// Which store backs the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitBackend {
    /// In-process counters. Correct only for a single instance.
    Memory,
    /// Redis-backed counters. Required for multi-instance deployments.
    Shared,
}

/// Per-category quota.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CategoryLimit {
    /// Requests admitted per window.
    pub max_requests: u32,

    /// Fixed window length in milliseconds.
    pub window_ms: u64,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable inbound rate limiting.
    pub enabled: bool,

    /// Store backend.
    pub backend: RateLimitBackend,

    /// Redis connection URL; only used with the shared backend.
    pub redis_url: String,

    /// Sweep interval for expired in-memory windows, in seconds.
    pub sweep_interval_secs: u64,

    /// Quota per category. Categories are closed-world: requests in an
    /// unknown category are not limited.
    pub categories: HashMap<String, CategoryLimit>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let mut categories = HashMap::new();
        categories.insert(
            "ai-content".to_string(),
            CategoryLimit {
                max_requests: 20,
                window_ms: 60_000,
            },
        );
        categories.insert(
            "api".to_string(),
            CategoryLimit {
                max_requests: 120,
                window_ms: 60_000,
            },
        );
        Self {
            enabled: true,
            backend: RateLimitBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            sweep_interval_secs: 60,
            categories,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

//! Semantic configuration checks.
//!
//! Serde guarantees the shape; this stage guarantees the values make
//! sense together. Every problem is collected so operators see the full
//! list in one pass instead of fixing errors one restart at a time.

use thiserror::Error;
use url::Url;

use crate::config::schema::{GatewayConfig, RateLimitBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("provider id must not be empty")]
    EmptyProviderId,

    #[error("duplicate provider id '{0}'")]
    DuplicateProviderId(String),

    #[error("provider '{id}': invalid base_url: {reason}")]
    InvalidBaseUrl { id: String, reason: String },

    #[error("provider '{0}': api_key_env must not be empty")]
    EmptyApiKeyEnv(String),

    #[error("{scope}: failure_threshold must be at least 1")]
    ZeroFailureThreshold { scope: &'static str },

    #[error("{scope}: cooldown_ms must be at least 1")]
    ZeroCooldown { scope: &'static str },

    #[error("retries.max_attempts must be at least 1")]
    ZeroMaxAttempts,

    #[error("rate_limit: at least one category is required when enabled")]
    NoCategories,

    #[error("rate_limit category '{name}': {reason}")]
    BadCategory { name: String, reason: &'static str },

    #[error("rate_limit: shared backend requires redis_url")]
    MissingRedisUrl,

    #[error("rate_limit: invalid redis_url: {0}")]
    InvalidRedisUrl(String),
}

/// Validate a parsed configuration. Returns every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut seen_ids = std::collections::HashSet::new();
    for provider in &config.providers {
        if provider.id.is_empty() {
            errors.push(ValidationError::EmptyProviderId);
            continue;
        }
        if !seen_ids.insert(provider.id.as_str()) {
            errors.push(ValidationError::DuplicateProviderId(provider.id.clone()));
        }
        if let Err(e) = Url::parse(&provider.base_url) {
            errors.push(ValidationError::InvalidBaseUrl {
                id: provider.id.clone(),
                reason: e.to_string(),
            });
        }
        if provider.api_key_env.is_empty() {
            errors.push(ValidationError::EmptyApiKeyEnv(provider.id.clone()));
        }
    }

    for (scope, breaker) in [
        ("circuit_breaker", &config.circuit_breaker),
        ("global_circuit_breaker", &config.global_circuit_breaker),
    ] {
        if breaker.failure_threshold == 0 {
            errors.push(ValidationError::ZeroFailureThreshold { scope });
        }
        if breaker.cooldown_ms == 0 {
            errors.push(ValidationError::ZeroCooldown { scope });
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::ZeroMaxAttempts);
    }

    if config.rate_limit.enabled {
        if config.rate_limit.categories.is_empty() {
            errors.push(ValidationError::NoCategories);
        }
        for (name, limit) in &config.rate_limit.categories {
            if limit.max_requests == 0 {
                errors.push(ValidationError::BadCategory {
                    name: name.clone(),
                    reason: "max_requests must be at least 1",
                });
            }
            if limit.window_ms == 0 {
                errors.push(ValidationError::BadCategory {
                    name: name.clone(),
                    reason: "window_ms must be at least 1",
                });
            }
        }
        if config.rate_limit.backend == RateLimitBackend::Shared {
            if config.rate_limit.redis_url.is_empty() {
                errors.push(ValidationError::MissingRedisUrl);
            } else if let Err(e) = Url::parse(&config.rate_limit.redis_url) {
                errors.push(ValidationError::InvalidRedisUrl(e.to_string()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

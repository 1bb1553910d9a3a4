//! Provider failover orchestration.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;

use crate::config::schema::{CircuitBreakerConfig, GatewayConfig};
use crate::generation::provider::{ChatProvider, Provider};
use crate::generation::types::{
    AttemptError, GeneratedContent, GenerationError, GenerationResult, ProviderError,
    ProviderFailure,
};
use crate::observability::metrics;
use crate::resilience::{run_with_retry, BreakerError, BreakerStatus, CircuitBreaker, RetryPolicy};

/// Status payload for the observability endpoint.
#[derive(Debug, Serialize)]
pub struct EngineStatus {
    pub global: BreakerStatus,
    pub providers: Vec<ProviderStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProviderStatus {
    pub id: String,
    pub priority: u32,
    pub configured: bool,
    pub breaker: BreakerStatus,
}

/// Orchestrates configured providers in priority order, wrapping each
/// attempt in its own circuit breaker and the shared retry policy.
///
/// A separate global breaker guards the whole loop against systemic
/// overload: when it is open, generation is rejected outright — by design
/// there is no bypass path around it.
pub struct GenerationEngine {
    providers: Vec<Arc<dyn Provider>>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    breaker_config: CircuitBreakerConfig,
    global_breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
}

impl GenerationEngine {
    /// Build the production engine from configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let timeout = std::time::Duration::from_secs(config.timeouts.provider_secs);
        let providers = config
            .providers
            .iter()
            .map(|p| Arc::new(ChatProvider::from_config(p, timeout)) as Arc<dyn Provider>)
            .collect();

        Self::with_providers(
            providers,
            config.circuit_breaker.clone(),
            config.global_circuit_breaker.clone(),
            RetryPolicy::from(&config.retries),
        )
    }

    /// Build an engine over explicit provider instances. Used by tests and
    /// by callers that own their provider clients.
    pub fn with_providers(
        providers: Vec<Arc<dyn Provider>>,
        breaker_config: CircuitBreakerConfig,
        global_breaker_config: CircuitBreakerConfig,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            providers,
            breakers: DashMap::new(),
            global_breaker: CircuitBreaker::new("generation", &global_breaker_config),
            breaker_config,
            retry_policy,
        }
    }

    /// Generate content for `prompt`, failing over across providers.
    ///
    /// Providers without credentials are filtered first; an empty
    /// remainder is a configuration fault and does not touch any breaker.
    pub async fn generate(&self, prompt: &str) -> GenerationResult<GeneratedContent> {
        let started = Instant::now();
        let mut active: Vec<&Arc<dyn Provider>> =
            self.providers.iter().filter(|p| p.is_configured()).collect();
        if active.is_empty() {
            return Err(GenerationError::NoProviderConfigured);
        }
        active.sort_by_key(|p| p.priority());

        let result = self
            .global_breaker
            .execute(|| self.attempt_providers(&active, prompt))
            .await;

        match result {
            Ok(content) => {
                metrics::record_generation(&content.provider_id, "success", started);
                Ok(content)
            }
            Err(BreakerError::Open(open)) => {
                metrics::record_generation("none", "global_open", started);
                Err(GenerationError::CircuitOpen {
                    retry_in: open.retry_in,
                })
            }
            Err(BreakerError::Inner(error)) => {
                metrics::record_generation("none", "exhausted", started);
                Err(error)
            }
        }
    }

    async fn attempt_providers(
        &self,
        providers: &[&Arc<dyn Provider>],
        prompt: &str,
    ) -> Result<GeneratedContent, GenerationError> {
        let mut failures = Vec::with_capacity(providers.len());

        for provider in providers {
            let id = provider.id();
            let breaker = self.breaker_for(id);

            // The whole retry loop is one unit to the breaker: one
            // success/failure per logical call.
            let outcome = breaker
                .execute(|| {
                    run_with_retry(
                        &self.retry_policy,
                        || provider.invoke(prompt),
                        |e: &ProviderError| e.kind.is_retryable(),
                    )
                })
                .await;

            match outcome {
                Ok(content) => {
                    tracing::debug!(provider = %id, "Generation succeeded");
                    return Ok(GeneratedContent {
                        content,
                        provider_id: id.to_string(),
                    });
                }
                Err(BreakerError::Open(open)) => {
                    tracing::warn!(
                        provider = %id,
                        retry_in_ms = open.retry_in.as_millis() as u64,
                        "Provider circuit open, falling through"
                    );
                    failures.push(ProviderFailure {
                        provider_id: id.to_string(),
                        error: AttemptError::CircuitOpen {
                            retry_in: open.retry_in,
                        },
                    });
                }
                Err(BreakerError::Inner(error)) => {
                    tracing::warn!(
                        provider = %id,
                        kind = ?error.kind,
                        error = %error,
                        "Provider failed, falling through"
                    );
                    failures.push(ProviderFailure {
                        provider_id: id.to_string(),
                        error: AttemptError::Provider(error),
                    });
                }
            }
        }

        Err(GenerationError::AllProvidersExhausted { failures })
    }

    fn breaker_for(&self, id: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(id, &self.breaker_config)))
            .clone()
    }

    /// Snapshot of the global and per-provider breakers.
    pub fn status(&self) -> EngineStatus {
        let providers = self
            .providers
            .iter()
            .map(|p| ProviderStatus {
                id: p.id().to_string(),
                priority: p.priority(),
                configured: p.is_configured(),
                breaker: self.breaker_for(p.id()).status(),
            })
            .collect();

        EngineStatus {
            global: self.global_breaker.status(),
            providers,
        }
    }
}

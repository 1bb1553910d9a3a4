//! Generation types and error taxonomy.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// What a provider failure is, independent of its wording.
///
/// The kind is attached where the HTTP response is decoded; everything
/// downstream (retry classification, breaker accounting, logging) branches
/// on this tag and never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Provider returned 429.
    RateLimited,
    /// The request deadline elapsed.
    Timeout,
    /// Provider returned a 5xx.
    ServiceUnavailable,
    /// Connection-level failure before any response.
    Network,
    /// Provider rejected the request as malformed (4xx).
    InvalidRequest,
    /// Credentials missing or rejected.
    Unauthorized,
}

impl ProviderErrorKind {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited
                | ProviderErrorKind::Timeout
                | ProviderErrorKind::ServiceUnavailable
                | ProviderErrorKind::Network
        )
    }
}

/// A single provider invocation failure.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Terminal error of one provider's slot in the failover loop: either its
/// breaker rejected without a call, or the (retried) call itself failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("circuit open; next probe in {}ms", retry_in.as_millis())]
    CircuitOpen { retry_in: Duration },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// One entry of the exhaustion aggregate.
#[derive(Debug, Error)]
#[error("provider '{provider_id}': {error}")]
pub struct ProviderFailure {
    pub provider_id: String,
    #[source]
    pub error: AttemptError,
}

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedContent {
    pub content: String,
    pub provider_id: String,
}

/// Errors surfaced by [`crate::generation::GenerationEngine::generate`].
#[derive(Debug, Error)]
pub enum GenerationError {
    /// No provider has credentials configured. Fatal, never retried.
    #[error("no generation provider is configured")]
    NoProviderConfigured,

    /// The global breaker rejected the whole call.
    #[error("generation capability is cooling down; next probe in {}ms", retry_in.as_millis())]
    CircuitOpen { retry_in: Duration },

    /// Every configured provider failed. Carries the full per-provider
    /// detail; callers must log it, not swallow it.
    #[error("all {} providers exhausted", failures.len())]
    AllProvidersExhausted { failures: Vec<ProviderFailure> },
}

pub type GenerationResult<T> = Result<T, GenerationError>;

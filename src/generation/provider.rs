//! Generation providers.
//!
//! # Responsibilities
//! - Define the minimal capability the failover loop requires of a provider
//! - Adapt OpenAI-compatible chat-completions APIs to that capability
//! - Attach a structured error kind at the HTTP boundary

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::schema::ProviderConfig;
use crate::generation::types::{ProviderError, ProviderErrorKind};

/// The only capability the failover orchestrator requires.
///
/// Implementations own their client, credentials, and request shaping;
/// the orchestrator sees an opaque `prompt -> text` call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, also the breaker resource name.
    fn id(&self) -> &str;

    /// Failover order; lower is tried first.
    fn priority(&self) -> u32;

    /// Whether credentials are present. Unconfigured providers are
    /// filtered out before the failover loop starts.
    fn is_configured(&self) -> bool;

    /// Perform one generation call.
    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Provider adapter for OpenAI-compatible `/chat/completions` endpoints
/// (Groq, OpenAI, and most inference gateways speak this shape).
pub struct ChatProvider {
    id: String,
    priority: u32,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatProvider {
    /// Build from configuration. The API key is read from the environment
    /// variable named in the config; a missing key leaves the provider
    /// present but unconfigured.
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                provider = %config.id,
                env = %config.api_key_env,
                "Provider has no API key; it will be skipped"
            );
        }

        let endpoint = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );

        Self {
            id: config.id.clone(),
            priority: config.priority,
            endpoint,
            model: config.model.clone(),
            api_key,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn kind_for_status(status: StatusCode) -> ProviderErrorKind {
        match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderErrorKind::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorKind::Unauthorized,
            s if s.is_server_error() => ProviderErrorKind::ServiceUnavailable,
            _ => ProviderErrorKind::InvalidRequest,
        }
    }

    fn kind_for_transport(error: &reqwest::Error) -> ProviderErrorKind {
        if error.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        }
    }
}

#[async_trait]
impl Provider for ChatProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn invoke(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::Unauthorized, "no API key configured")
        })?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::new(Self::kind_for_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                Self::kind_for_status(status),
                format!("HTTP {}: {}", status.as_u16(), truncate(&body, 200)),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::ServiceUnavailable,
                format!("undecodable response body: {e}"),
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::new(
                    ProviderErrorKind::ServiceUnavailable,
                    "response contained no choices",
                )
            })
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

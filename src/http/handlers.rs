//! API handlers.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::generation::engine::EngineStatus;
use crate::generation::types::GenerationError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::rate_limit::CategoryStatus;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub content: String,
    pub provider: String,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct GatewayStatus {
    pub version: &'static str,
    pub generation: EngineStatus,
    pub rate_limit: RateLimitStatus,
}

#[derive(Serialize)]
pub struct RateLimitStatus {
    pub enabled: bool,
    pub categories: Vec<CategoryStatus>,
}

/// POST /api/content/generate
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let started = Instant::now();
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        metrics::record_request("POST", 400, started);
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "prompt must not be empty"})),
        )
            .into_response();
    }

    match state.engine.generate(prompt).await {
        Ok(generated) => {
            metrics::record_request("POST", 200, started);
            (
                StatusCode::OK,
                Json(GenerateResponse {
                    content: generated.content,
                    provider: generated.provider_id,
                }),
            )
                .into_response()
        }
        Err(error) => {
            let (status, body) = render_generation_error(&error);
            metrics::record_request("POST", status.as_u16(), started);
            (status, Json(body)).into_response()
        }
    }
}

/// Map internal failure detail onto the user-facing response. Per-provider
/// detail stays in the logs; callers get a generic message plus retry
/// guidance where one exists.
fn render_generation_error(error: &GenerationError) -> (StatusCode, serde_json::Value) {
    match error {
        GenerationError::NoProviderConfigured => {
            tracing::error!("Generation requested but no provider is configured");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({"error": "content generation is not configured"}),
            )
        }
        GenerationError::CircuitOpen { retry_in } => {
            let retry_after = (retry_in.as_millis() as u64).div_ceil(1000);
            tracing::warn!(
                retry_in_ms = retry_in.as_millis() as u64,
                "Generation rejected: global circuit open"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": "content generation is cooling down",
                    "retry_after": retry_after,
                }),
            )
        }
        GenerationError::AllProvidersExhausted { failures } => {
            for failure in failures {
                tracing::error!(
                    provider = %failure.provider_id,
                    error = %failure.error,
                    "Provider terminal failure"
                );
            }
            (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({"error": "content generation is temporarily unavailable"}),
            )
        }
    }
}

/// GET /health
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /api/status
pub async fn status(State(state): State<AppState>) -> Json<GatewayStatus> {
    let categories = state
        .limiter
        .as_ref()
        .map(|l| l.status())
        .unwrap_or_default();

    Json(GatewayStatus {
        version: env!("CARGO_PKG_VERSION"),
        generation: state.engine.status(),
        rate_limit: RateLimitStatus {
            enabled: state.limiter.is_some(),
            categories,
        },
    })
}

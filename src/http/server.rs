//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (timeout, request ID, tracing, rate limit)
//! - Build the rate-limit store for the configured backend
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::schema::{GatewayConfig, RateLimitBackend};
use crate::generation::GenerationEngine;
use crate::http::handlers;
use crate::http::request::MakeRequestUuid;
use crate::lifecycle::Shutdown;
use crate::security::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::security::store::{MemoryStore, RateLimitStore, SharedStore, StoreError};

/// Prompt payloads are small; anything bigger is not a generation request.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<GenerationEngine>,
    /// None when rate limiting is disabled in config.
    pub limiter: Option<Arc<RateLimiter>>,
    pub config: Arc<GatewayConfig>,
}

/// HTTP server for the content gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server with providers built from configuration.
    ///
    /// Fails fast when the shared rate-limit store is configured but
    /// unreachable, rather than failing open forever from the start.
    pub async fn new(config: GatewayConfig, shutdown: &Shutdown) -> Result<Self, StoreError> {
        let engine = Arc::new(GenerationEngine::from_config(&config));
        Self::with_engine(config, engine, shutdown).await
    }

    /// Create a server around an existing engine. Used by tests and by
    /// embedders that own their provider clients.
    pub async fn with_engine(
        config: GatewayConfig,
        engine: Arc<GenerationEngine>,
        shutdown: &Shutdown,
    ) -> Result<Self, StoreError> {
        let limiter = if config.rate_limit.enabled {
            let store: Arc<dyn RateLimitStore> = match config.rate_limit.backend {
                RateLimitBackend::Memory => {
                    let store = Arc::new(MemoryStore::new());
                    store.spawn_sweeper(
                        Duration::from_secs(config.rate_limit.sweep_interval_secs),
                        shutdown.subscribe(),
                    );
                    store
                }
                RateLimitBackend::Shared => {
                    Arc::new(SharedStore::connect(&config.rate_limit.redis_url).await?)
                }
            };
            Some(Arc::new(RateLimiter::new(store, &config.rate_limit)))
        } else {
            None
        };

        let state = AppState {
            engine,
            limiter,
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/api/content/generate", post(handlers::generate))
            .route("/api/status", get(handlers::status))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit_middleware,
            ));

        Router::new()
            .merge(api)
            .route("/health", get(handlers::health))
            .with_state(state)
            .layer(
                // Set must run before Propagate so the generated ID is
                // visible on the way out.
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                    .layer(TimeoutLayer::with_status_code(
                        StatusCode::REQUEST_TIMEOUT,
                        Duration::from_secs(config.timeouts.request_secs),
                    )),
            )
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

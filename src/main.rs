//! Resilient AI content gateway.
//!
//! The storefront platform's one external-facing capability with real
//! failure modes: AI copy generation across unreliable providers. Every
//! outbound call goes through a per-provider circuit breaker and bounded
//! retries; the inbound API is rate limited per caller.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────┐
//!                     │                CONTENT GATEWAY                 │
//!                     │                                                │
//!   Client Request    │  ┌──────┐   ┌────────────┐   ┌─────────────┐  │
//!   ──────────────────┼─▶│ http │──▶│ rate limit │──▶│ generation  │  │
//!                     │  │server│   │ middleware │   │   engine    │  │
//!                     │  └──────┘   └────────────┘   └──────┬──────┘  │
//!                     │                                     │         │
//!                     │              per provider:          ▼         │
//!                     │  ┌──────────┐  ┌───────┐  ┌──────────────┐    │      Provider
//!   Client Response   │  │ circuit  │─▶│ retry │─▶│   provider   │────┼────▶ API
//!   ◀─────────────────┼──│ breaker  │  │backoff│  │    invoke    │    │
//!                     │  └──────────┘  └───────┘  └──────────────┘    │
//!                     │                                                │
//!                     │  ┌──────────────────────────────────────────┐ │
//!                     │  │          Cross-Cutting Concerns          │ │
//!                     │  │  config · observability · lifecycle      │ │
//!                     │  └──────────────────────────────────────────┘ │
//!                     └────────────────────────────────────────────────┘
//! ```

use std::path::Path;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use content_gateway::config::loader::load_config;
use content_gateway::config::GatewayConfig;
use content_gateway::http::HttpServer;
use content_gateway::lifecycle::Shutdown;
use content_gateway::observability::metrics;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "content_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("content-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    // Load configuration: explicit path argument, or defaults.
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path))?,
        None => {
            tracing::info!("No config file given, using defaults");
            GatewayConfig::default()
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        providers = config.providers.len(),
        rate_limit_enabled = config.rate_limit.enabled,
        "Configuration loaded"
    );

    // Initialize metrics exporter
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, &shutdown).await?;
    let server_shutdown = shutdown.subscribe();

    // Ctrl+C triggers the shared shutdown broadcast.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

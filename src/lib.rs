//! Resilient AI content gateway for the storefront platform.
//!
//! Guards every outbound provider call with a circuit breaker and bounded
//! retries, fails over across providers in priority order, and protects
//! the inbound API with pluggable fixed-window rate limiting.

pub mod config;
pub mod generation;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;

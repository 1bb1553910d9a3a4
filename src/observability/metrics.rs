//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): API requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_generation_total` (counter): generation calls by provider, outcome
//! - `gateway_generation_duration_seconds` (histogram): generation latency
//! - `gateway_rate_limited_total` (counter): denials by category
//! - `gateway_rate_limit_store_failures_total` (counter): fail-open events
//! - `gateway_breaker_transitions_total` (counter): breaker transitions by
//!   resource and new state

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter on its own listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed API request.
pub fn record_request(method: &str, status: u16, started: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

/// Record one generation call outcome.
pub fn record_generation(provider: &str, outcome: &str, started: Instant) {
    metrics::counter!(
        "gateway_generation_total",
        "provider" => provider.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);
    metrics::histogram!("gateway_generation_duration_seconds")
        .record(started.elapsed().as_secs_f64());
}

/// Record a rate limit denial.
pub fn record_rate_limited(category: &str) {
    metrics::counter!(
        "gateway_rate_limited_total",
        "category" => category.to_string(),
    )
    .increment(1);
}

/// Record a store failure that caused a fail-open decision.
pub fn record_rate_limit_store_failure() {
    metrics::counter!("gateway_rate_limit_store_failures_total").increment(1);
}

/// Record a circuit breaker state transition.
pub fn record_breaker_transition(resource: &str, to: CircuitState) {
    metrics::counter!(
        "gateway_breaker_transitions_total",
        "resource" => resource.to_string(),
        "state" => to.to_string(),
    )
    .increment(1);
}

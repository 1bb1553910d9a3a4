//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external provider:
//!     → circuit_breaker.rs (reject immediately if the resource is known-bad)
//!     → retry.rs (absorb transient failures with bounded backoff)
//!     → provider invoke (the actual I/O)
//! ```
//!
//! # Design Decisions
//! - The retry loop is one unit to the breaker: one success/failure per
//!   logical call, never one per attempt
//! - Retries only for errors classified retryable by structured kind,
//!   never by scanning error message text
//! - Breakers fail fast in Open state; a single probe tests recovery
//! - Backoff is pure exponential; the delay sequence is part of the contract

pub mod backoff;
pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{BreakerError, BreakerStatus, CircuitBreaker, CircuitOpen, CircuitState};
pub use retry::{run_with_retry, RetryPolicy};

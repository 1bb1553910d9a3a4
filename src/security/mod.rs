//! Inbound protection subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → rate_limit.rs middleware (identity + category → quota check)
//!         → store.rs (in-process or shared counters)
//!     → allowed: handler runs, X-RateLimit-* headers attached
//!     → denied: 429 with Retry-After, handler never runs
//! ```
//!
//! # Design Decisions
//! - Fixed-window counting; a boundary burst of up to 2× the quota is an
//!   accepted trade-off (the store trait is the seam for a sliding-window
//!   upgrade)
//! - Store failures fail open: the limiter's own infrastructure being
//!   down must not block legitimate traffic
//! - The in-process store is only correct for a single instance; shared
//!   deployments must use the Redis-backed store

pub mod rate_limit;
pub mod store;

pub use rate_limit::{rate_limit_middleware, RateLimitDecision, RateLimiter};
pub use store::{MemoryStore, RateLimitRecord, RateLimitStore, SharedStore, StoreError};

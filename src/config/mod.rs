//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so a minimal config file works
//! - Validation separates syntactic (serde) from semantic checks
//! - Rate-limit categories are an explicit enumerated map validated at
//!   startup, not a loosely-typed bag

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    CategoryLimit, CircuitBreakerConfig, GatewayConfig, ProviderConfig, RateLimitBackend,
    RateLimitConfig, RetryConfig,
};

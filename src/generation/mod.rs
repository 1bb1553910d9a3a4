//! AI content generation subsystem.
//!
//! # Data Flow
//! ```text
//! generate(prompt)
//!     → global circuit breaker (systemic overload guard)
//!     → providers in ascending priority order:
//!         per-provider circuit breaker
//!             → retry with exponential backoff
//!                 → provider.invoke(prompt)   (HTTP call)
//!     → first success wins; exhaustion aggregates every failure
//! ```
//!
//! # Design Decisions
//! - Providers are opaque `invoke(prompt) -> text` capabilities; prompt
//!   engineering and model semantics live with the caller
//! - Errors carry a structured kind assigned at the provider boundary;
//!   retry policy never inspects message text
//! - An open global breaker rejects outright; there is no bypass path

pub mod engine;
pub mod provider;
pub mod types;

pub use engine::GenerationEngine;
pub use provider::{ChatProvider, Provider};
pub use types::{GeneratedContent, GenerationError, ProviderError, ProviderErrorKind};

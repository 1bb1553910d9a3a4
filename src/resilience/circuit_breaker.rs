//! Circuit breaker for external dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast
//! - Half-Open: testing if the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: next call after cooldown_ms admitted as probe
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails (cooldown restarts)
//! ```
//!
//! # Design Decisions
//! - Per-resource breaker, created lazily on first use
//! - Rejection in Open state never invokes the wrapped call
//! - Single probe in Half-Open; concurrent callers are rejected while the
//!   probe is outstanding
//! - A probe abandoned without an outcome (caller cancelled) counts as a
//!   failure, so cancellation cannot latch the probe slot

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use crate::config::schema::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Rejection issued without invoking the wrapped call.
#[derive(Debug, Error)]
#[error("circuit '{resource}' is open; next probe permitted in {}ms", retry_in.as_millis())]
pub struct CircuitOpen {
    /// Name of the guarded resource.
    pub resource: String,
    /// Time until the next probe is admitted. Zero while a probe is
    /// already outstanding.
    pub retry_in: Duration,
}

/// Outcome of [`CircuitBreaker::execute`]: either the breaker rejected the
/// call, or the wrapped operation itself failed.
#[derive(Debug, Error)]
pub enum BreakerError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Open(#[from] CircuitOpen),
    #[error(transparent)]
    Inner(E),
}

/// Observability snapshot of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub remaining_cooldown_ms: u64,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

/// Per-resource circuit breaker.
///
/// All mutable state lives behind one mutex; critical sections are short
/// and never hold the lock across an await point.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a breaker guarding the named resource.
    pub fn new(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            failure_threshold: config.failure_threshold.max(1),
            cooldown: Duration::from_millis(config.cooldown_ms),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    /// Name of the guarded resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `op` under this breaker.
    ///
    /// Returns the operation's result on success. If the operation fails
    /// its original error is surfaced as [`BreakerError::Inner`] after the
    /// failure is recorded. If the breaker rejects, `op` is never invoked
    /// and [`BreakerError::Open`] carries the time until the next probe.
    pub async fn execute<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let permit = self.try_acquire()?;
        match op().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(error) => {
                permit.failure();
                Err(BreakerError::Inner(error))
            }
        }
    }

    /// Snapshot for status endpoints and orchestrator logging. Reading
    /// status never trips state transitions.
    pub fn status(&self) -> BreakerStatus {
        let inner = self.inner.lock().expect("breaker mutex poisoned");
        let remaining = match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(at)) => self.cooldown.saturating_sub(at.elapsed()),
            _ => Duration::ZERO,
        };
        BreakerStatus {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            remaining_cooldown_ms: remaining.as_millis() as u64,
        }
    }

    /// Admit or reject one call.
    fn try_acquire(&self) -> Result<BreakerPermit<'_>, CircuitOpen> {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => Ok(BreakerPermit::new(self, false)),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.cooldown {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_in_flight = true;
                    Ok(BreakerPermit::new(self, true))
                } else {
                    Err(CircuitOpen {
                        resource: self.name.clone(),
                        retry_in: self.cooldown - elapsed,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    Err(CircuitOpen {
                        resource: self.name.clone(),
                        retry_in: Duration::ZERO,
                    })
                } else {
                    inner.trial_in_flight = true;
                    Ok(BreakerPermit::new(self, true))
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        inner.consecutive_failures = 0;
        inner.trial_in_flight = false;
        if inner.state != CircuitState::Closed {
            inner.opened_at = None;
            self.transition(&mut inner, CircuitState::Closed);
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.opened_at = Some(Instant::now());
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                // Probe failed: restart the cooldown from now.
                inner.trial_in_flight = false;
                inner.opened_at = Some(Instant::now());
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {
                // A call admitted before the trip can still report here.
                inner.consecutive_failures += 1;
            }
        }
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        match to {
            CircuitState::Open => tracing::warn!(
                resource = %self.name,
                failures = inner.consecutive_failures,
                cooldown_ms = self.cooldown.as_millis() as u64,
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                resource = %self.name,
                "Circuit half-open, admitting probe"
            ),
            CircuitState::Closed => tracing::info!(
                resource = %self.name,
                "Circuit closed, resource recovered"
            ),
        }
        metrics::record_breaker_transition(&self.name, to);
    }
}

/// Tracks one admitted call until its outcome is recorded.
struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            resolved: false,
        }
    }

    fn success(mut self) {
        self.resolved = true;
        self.breaker.record_success();
    }

    fn failure(mut self) {
        self.resolved = true;
        self.breaker.record_failure();
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        // A probe dropped without an outcome means the caller was cancelled
        // mid-flight; the probe slot must not stay latched.
        if !self.resolved && self.trial {
            self.breaker.record_failure();
        }
    }
}

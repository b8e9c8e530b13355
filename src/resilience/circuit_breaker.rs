//! Circuit breaker for external service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast (or go to the fallback)
//! - Half-Open: trial calls decide whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: first call at or after next_attempt (no background timer)
//! Half-Open → Closed: 3 consecutive successes
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, owned by the manager
//! - Fail fast in Open state (no waiting for timeout)
//! - Every read-modify-write happens under one mutex, so concurrent failures
//!   trip the breaker exactly once; the lock is never held across an await
//! - Half-Open admits at most `HALF_OPEN_SUCCESS_THRESHOLD` trials at a time;
//!   extra callers are short-circuited
//! - Each admission carries the generation it was granted in. Results from an
//!   earlier generation update stats only and never move the state machine

use std::future::{ready, Future, Ready};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::error::{BreakerError, BreakerResult, Rejection};
use crate::resilience::state::{BreakerSnapshot, BreakerStats, CircuitState};
use crate::resilience::timeouts;

/// Consecutive Half-Open successes required to close the circuit.
pub const HALF_OPEN_SUCCESS_THRESHOLD: u32 = 3;

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    next_attempt: Instant,
    last_failure: Option<Instant>,
    last_reset: Instant,
    /// Bumped on every transition and manual reset.
    generation: u64,
    trials_in_flight: u32,
    stats: BreakerStats,
}

/// Permission to invoke the primary operation once.
///
/// Dropping a trial ticket frees its Half-Open slot, including when the caller
/// abandons the call mid-flight.
struct Ticket<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    trial: bool,
}

impl Drop for Ticket<'_> {
    fn drop(&mut self) {
        if !self.trial {
            return;
        }
        let mut inner = self.breaker.lock();
        if inner.generation == self.generation {
            inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
        }
    }
}

/// Failure-aware gate around calls to one external dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        let name = name.into();
        let now = Instant::now();
        metrics::record_state(&name, CircuitState::Closed);
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                next_attempt: now,
                last_failure: None,
                last_reset: now,
                generation: 0,
                trials_in_flight: 0,
                stats: BreakerStats::default(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// Run `operation` through the breaker with no fallback.
    ///
    /// Short-circuits and failures surface as [`BreakerError::Unavailable`].
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run(operation, None::<fn() -> Ready<Result<T, E>>>).await
    }

    /// Run `operation` through the breaker, answering from `fallback` when the
    /// primary is short-circuited or fails.
    ///
    /// The fallback runs at most once and never after a primary success.
    pub async fn execute_with_fallback<T, E, F, Fut, G, GFut>(
        &self,
        operation: F,
        fallback: G,
    ) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        self.run(operation, Some(fallback)).await
    }

    async fn run<T, E, F, Fut, G, GFut>(
        &self,
        operation: F,
        fallback: Option<G>,
    ) -> BreakerResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        G: FnOnce() -> GFut,
        GFut: Future<Output = Result<T, E>>,
    {
        let cause = match self.admit() {
            None => Rejection::CircuitOpen,
            Some(ticket) => match timeouts::race(self.config.timeout(), operation()).await {
                Ok(value) => {
                    self.on_success(&ticket);
                    return Ok(value);
                }
                Err(cause) => {
                    self.on_failure(&ticket, matches!(cause, Rejection::Timeout(_)));
                    cause
                }
            },
        };

        let Some(fallback) = fallback else {
            return Err(BreakerError::Unavailable {
                service: self.name.clone(),
                cause,
            });
        };

        self.on_fallback();
        match fallback().await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(service = %self.name, "Fallback failed after primary failure");
                Err(BreakerError::FallbackFailed {
                    service: self.name.clone(),
                    cause,
                    fallback: e,
                })
            }
        }
    }

    /// Current state tag. Does not perform the lazy Open → Half-Open transition.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn is_healthy(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Owned copy of the breaker's state and counters.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        let now = Instant::now();
        let wall = SystemTime::now();
        let retry_in = match inner.state {
            CircuitState::Open => inner.next_attempt.saturating_duration_since(now),
            CircuitState::Closed | CircuitState::HalfOpen => Duration::ZERO,
        };

        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            failure_threshold: self.config.failure_threshold,
            last_failure_ms: inner.last_failure.map(|at| epoch_millis(at, now, wall)),
            next_attempt_ms: epoch_millis(inner.next_attempt, now, wall),
            retry_in_ms: retry_in.as_millis() as u64,
            config: self.config,
            stats: inner.stats,
            success_rate: inner.stats.success_rate(),
            uptime_ms: now.saturating_duration_since(inner.last_reset).as_millis() as u64,
        }
    }

    /// Force the breaker back to Closed. Cumulative stats are kept.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.success_count = 0;
        inner.last_failure = None;
        inner.next_attempt = Instant::now();
        inner.last_reset = inner.next_attempt;
        inner.generation += 1;
        inner.trials_in_flight = 0;
        metrics::record_state(&self.name, CircuitState::Closed);
        tracing::info!(service = %self.name, "Circuit breaker manually reset");
    }

    /// Trip the breaker by hand; it stays open for a full `reset_timeout`.
    pub fn force_open(&self) {
        let mut inner = self.lock();
        self.transition(&mut inner, CircuitState::Open);
    }

    fn admit(&self) -> Option<Ticket<'_>> {
        let mut inner = self.lock();
        inner.stats.total_requests += 1;

        let state = inner.state;
        let trial = match state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let now = Instant::now();
                if now < inner.next_attempt {
                    inner.stats.short_circuited += 1;
                    tracing::debug!(
                        service = %self.name,
                        retry_in_ms = inner.next_attempt.duration_since(now).as_millis() as u64,
                        "Circuit breaker is open, short-circuiting call"
                    );
                    metrics::record_call(&self.name, metrics::OUTCOME_SHORT_CIRCUIT);
                    return None;
                }
                self.transition(&mut inner, CircuitState::HalfOpen);
                true
            }
        };

        if trial {
            if inner.trials_in_flight >= HALF_OPEN_SUCCESS_THRESHOLD {
                inner.stats.short_circuited += 1;
                tracing::debug!(
                    service = %self.name,
                    in_flight = inner.trials_in_flight,
                    "Half-open trial slots taken, short-circuiting call"
                );
                metrics::record_call(&self.name, metrics::OUTCOME_SHORT_CIRCUIT);
                return None;
            }
            inner.trials_in_flight += 1;
        }

        Some(Ticket {
            breaker: self,
            generation: inner.generation,
            trial,
        })
    }

    fn on_success(&self, ticket: &Ticket<'_>) {
        let mut inner = self.lock();
        inner.stats.successful_requests += 1;
        metrics::record_call(&self.name, metrics::OUTCOME_SUCCESS);

        if inner.generation != ticket.generation {
            tracing::debug!(service = %self.name, "Late success from an earlier circuit state ignored");
            return;
        }

        inner.failure_count = 0;
        let state = inner.state;
        match state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= HALF_OPEN_SUCCESS_THRESHOLD {
                    self.transition(&mut inner, CircuitState::Closed);
                } else {
                    tracing::debug!(
                        service = %self.name,
                        successes = inner.success_count,
                        required = HALF_OPEN_SUCCESS_THRESHOLD,
                        "Half-open trial call succeeded"
                    );
                }
            }
            CircuitState::Closed | CircuitState::Open => {}
        }
    }

    fn on_failure(&self, ticket: &Ticket<'_>, timed_out: bool) {
        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());
        inner.stats.failed_requests += 1;
        if timed_out {
            inner.stats.timeouts += 1;
        }
        let outcome = if timed_out {
            metrics::OUTCOME_TIMEOUT
        } else {
            metrics::OUTCOME_FAILURE
        };
        metrics::record_call(&self.name, outcome);

        if inner.generation != ticket.generation {
            tracing::debug!(service = %self.name, timed_out, "Late failure from an earlier circuit state ignored");
            return;
        }

        inner.failure_count = inner.failure_count.saturating_add(1);
        let state = inner.state;
        match state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                } else {
                    tracing::debug!(
                        service = %self.name,
                        failures = inner.failure_count,
                        threshold = self.config.failure_threshold,
                        timed_out,
                        "Protected call failed"
                    );
                }
            }
            // A single failed trial is enough evidence; no fresh threshold count.
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    fn on_fallback(&self) {
        self.lock().stats.fallback_invocations += 1;
        metrics::record_call(&self.name, metrics::OUTCOME_FALLBACK);
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.generation += 1;
        inner.trials_in_flight = 0;

        match to {
            CircuitState::Open => {
                inner.next_attempt = Instant::now() + self.config.reset_timeout();
                inner.success_count = 0;
                inner.stats.circuit_open_events += 1;
                tracing::warn!(
                    service = %self.name,
                    from = %from,
                    failures = inner.failure_count,
                    threshold = self.config.failure_threshold,
                    retry_in_ms = self.config.reset_timeout_ms,
                    "Circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                inner.success_count = 0;
                inner.stats.circuit_half_open_events += 1;
                tracing::info!(service = %self.name, "Circuit breaker half-open, testing recovery");
            }
            CircuitState::Closed => {
                inner.success_count = 0;
                inner.failure_count = 0;
                inner.stats.circuit_closed_events += 1;
                tracing::info!(service = %self.name, "Circuit breaker closed, normal operation resumed");
            }
        }

        metrics::record_transition(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map a monotonic instant onto the wall clock, in Unix epoch milliseconds.
fn epoch_millis(at: Instant, now: Instant, wall: SystemTime) -> u64 {
    let mapped = if at >= now {
        wall.checked_add(at.duration_since(now))
    } else {
        wall.checked_sub(now.duration_since(at))
    };
    mapped
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A fallback that always answers with `value`.
pub fn fallback_value<T, E>(value: T) -> impl FnOnce() -> Ready<Result<T, E>> {
    move || ready(Ok(value))
}

//! Circuit state, cumulative statistics and read-only snapshots.

use serde::{Deserialize, Serialize};

use crate::config::BreakerConfig;

/// Operating state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Calls pass through normally.
    Closed,
    /// Calls are short-circuited until the cooldown elapses.
    Open,
    /// Trial calls are allowed; successes close the circuit, a failure re-opens it.
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding for the state gauge (0 closed, 1 half-open, 2 open).
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative counters for one breaker.
///
/// Counters only grow; `reset()` on the breaker leaves them untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Failures caused by the timeout race (also counted in `failed_requests`).
    pub timeouts: u64,
    /// Calls rejected without invoking the primary operation.
    pub short_circuited: u64,
    pub fallback_invocations: u64,
    pub circuit_open_events: u64,
    pub circuit_half_open_events: u64,
    pub circuit_closed_events: u64,
}

impl BreakerStats {
    /// Percentage of requests that succeeded, 0.0 when nothing has been attempted.
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64 * 100.0
    }
}

/// Point-in-time copy of a breaker's state.
///
/// Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub failure_threshold: u32,
    pub last_failure_ms: Option<u64>,
    pub next_attempt_ms: u64,
    /// Remaining cooldown while open; 0 once a trial call would be admitted.
    pub retry_in_ms: u64,
    pub config: BreakerConfig,
    pub stats: BreakerStats,
    /// `stats.success_rate()` at snapshot time.
    pub success_rate: f64,
    /// Time since the breaker was created or last manually reset.
    pub uptime_ms: u64,
}

impl BreakerSnapshot {
    pub fn is_healthy(&self) -> bool {
        self.state == CircuitState::Closed
    }
}

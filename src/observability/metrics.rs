//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define breaker metrics (call outcomes, transitions, current state)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `circuit_breaker_requests_total` (counter): protected calls by service, outcome
//! - `circuit_breaker_transitions_total` (counter): state changes by service, target state
//! - `circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed, so library users and
//!   tests pay nothing
//! - Labels are bounded by the number of registered services

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::state::CircuitState;

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const OUTCOME_TIMEOUT: &str = "timeout";
pub const OUTCOME_SHORT_CIRCUIT: &str = "short_circuit";
pub const OUTCOME_FALLBACK: &str = "fallback";

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one protected call.
pub fn record_call(service: &str, outcome: &'static str) {
    counter!(
        "circuit_breaker_requests_total",
        "service" => service.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record a state change and update the state gauge.
pub fn record_transition(service: &str, to: CircuitState) {
    counter!(
        "circuit_breaker_transitions_total",
        "service" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(service, to);
}

/// Set the state gauge without counting a transition (creation, manual reset).
pub fn record_state(service: &str, state: CircuitState) {
    gauge!("circuit_breaker_state", "service" => service.to_string()).set(state.as_gauge());
}

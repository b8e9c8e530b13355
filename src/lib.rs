//! Circuit breakers for calls to external services.
//!
//! Each external dependency (AI backend, email API, KV storage, ...) gets a
//! named [`CircuitBreaker`] from a shared [`CircuitBreakerManager`]. Calls go
//! through [`CircuitBreaker::execute`] or [`CircuitBreaker::execute_with_fallback`].

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::GuardConfig;
pub use lifecycle::Shutdown;
pub use resilience::{
    BreakerError, BreakerSnapshot, CircuitBreaker, CircuitBreakerManager, CircuitState, HealthReport,
};

//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an external service:
//!     → manager.rs (look up or lazily create the service's breaker)
//!     → circuit_breaker.rs (admit, short-circuit, or trial the call)
//!     → timeouts.rs (race the call against its deadline)
//!     → circuit_breaker.rs (classify outcome, update state, maybe fall back)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every protected call has a deadline
//! - No retries inside a protected call; callers retry by calling again
//! - A failure is never swallowed: the caller gets a value, a fallback value,
//!   or a typed error
//! - Breaker state is per process and in memory only

pub mod circuit_breaker;
pub mod error;
pub mod manager;
pub mod state;
pub mod timeouts;

pub use circuit_breaker::{fallback_value, CircuitBreaker, HALF_OPEN_SUCCESS_THRESHOLD};
pub use error::{BreakerError, BreakerResult, Rejection, RegistryError};
pub use manager::{CircuitBreakerManager, HealthReport, OverallStatus, UnhealthyService};
pub use state::{BreakerSnapshot, BreakerStats, CircuitState};

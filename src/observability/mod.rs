//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and the registry produce:
//!     → logging.rs (structured log events per transition and failure)
//!     → metrics.rs (counters and state gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`service`, `failures`, `threshold`) on every event
//! - Trips log at warn, recoveries at info, per-call detail at debug
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

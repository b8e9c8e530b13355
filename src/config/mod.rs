//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GuardConfig (validated, immutable)
//!     → CircuitBreakerManager policy (defaults + per-service overrides)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the manager's policy
//!     → breakers created afterwards observe new settings
//! ```
//!
//! # Design Decisions
//! - Breaker settings resolve in layers: registry defaults, `[defaults]`,
//!   `[services.<name>]`, then per-call overrides
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{AdminConfig, BreakerConfig, BreakerOverrides, GuardConfig, ObservabilityConfig};
pub use validation::{validate_breaker, ValidationError};

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the circuit guard daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// Overrides applied on top of the registry defaults for every service.
    pub defaults: BreakerOverrides,

    /// Per-service overrides, keyed by service name (e.g. "ai", "email").
    pub services: BTreeMap<String, BreakerOverrides>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Fully resolved settings for a single circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,

    /// Upper bound on a single protected call, in milliseconds.
    pub timeout_ms: u64,

    /// How long the breaker stays open before a trial call, in milliseconds.
    pub reset_timeout_ms: u64,

    /// Aggregation window in milliseconds. Reserved; carried for observability only.
    pub monitoring_period_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout_ms: 60_000,
            reset_timeout_ms: 30_000,
            monitoring_period_ms: 10_000,
        }
    }
}

impl BreakerConfig {
    /// Defaults used by the registry when creating breakers lazily.
    pub fn registry_default() -> Self {
        Self {
            failure_threshold: 3,
            timeout_ms: 5_000,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }

    pub fn monitoring_period(&self) -> Duration {
        Duration::from_millis(self.monitoring_period_ms)
    }

    /// Return a copy with every field set in `overrides` replaced.
    pub fn merged(mut self, overrides: &BreakerOverrides) -> Self {
        if let Some(v) = overrides.failure_threshold {
            self.failure_threshold = v;
        }
        if let Some(v) = overrides.timeout_ms {
            self.timeout_ms = v;
        }
        if let Some(v) = overrides.reset_timeout_ms {
            self.reset_timeout_ms = v;
        }
        if let Some(v) = overrides.monitoring_period_ms {
            self.monitoring_period_ms = v;
        }
        self
    }
}

/// Partial breaker settings; unset fields fall through to the layer below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakerOverrides {
    pub failure_threshold: Option<u32>,
    pub timeout_ms: Option<u64>,
    pub reset_timeout_ms: Option<u64>,
    pub monitoring_period_ms: Option<u64>,
}

impl BreakerOverrides {
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn reset_timeout(mut self, reset_timeout: Duration) -> Self {
        self.reset_timeout_ms = Some(reset_timeout.as_millis() as u64);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_defaults() {
        let standalone = BreakerConfig::default();
        assert_eq!(standalone.failure_threshold, 5);
        assert_eq!(standalone.timeout(), Duration::from_secs(60));
        assert_eq!(standalone.reset_timeout(), Duration::from_secs(30));
        assert_eq!(standalone.monitoring_period(), Duration::from_secs(10));

        let registry = BreakerConfig::registry_default();
        assert_eq!(registry.failure_threshold, 3);
        assert_eq!(registry.timeout(), Duration::from_secs(5));
        assert_eq!(registry.reset_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_merge_only_touches_set_fields() {
        let overrides = BreakerOverrides::default()
            .failure_threshold(7)
            .timeout(Duration::from_millis(250));
        let merged = BreakerConfig::registry_default().merged(&overrides);

        assert_eq!(merged.failure_threshold, 7);
        assert_eq!(merged.timeout_ms, 250);
        assert_eq!(merged.reset_timeout_ms, 30_000);
        assert!(BreakerOverrides::default().is_empty());
        assert!(!overrides.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: GuardConfig = toml::from_str(
            r#"
            [defaults]
            reset_timeout_ms = 15000

            [services.ai]
            failure_threshold = 3
            timeout_ms = 3000

            [admin]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.defaults.reset_timeout_ms, Some(15_000));
        assert_eq!(config.defaults.failure_threshold, None);
        let ai = config.services.get("ai").unwrap();
        assert_eq!(ai.timeout_ms, Some(3_000));
        assert!(config.admin.enabled);
        assert_eq!(config.admin.bind_address, "127.0.0.1:8081");
        assert_eq!(config.observability.log_level, "info");
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds and timeouts > 0)
//! - Validate addresses the daemon will bind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerConfig, GuardConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: failure_threshold must be greater than 0")]
    ZeroThreshold { scope: String },

    #[error("{scope}: {field} must be greater than 0")]
    ZeroDuration { scope: String, field: &'static str },

    #[error("services: service name must not be empty")]
    EmptyServiceName,

    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must not be empty when the admin API is enabled")]
    MissingApiKey,
}

/// Validate a loaded configuration.
pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let base = BreakerConfig::registry_default().merged(&config.defaults);
    check_breaker("defaults", &base, &mut errors);

    for (name, overrides) in &config.services {
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyServiceName);
            continue;
        }
        let resolved = base.merged(overrides);
        check_breaker(&format!("services.{}", name), &resolved, &mut errors);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingApiKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check one resolved breaker configuration, reporting the first problem.
pub fn validate_breaker(scope: &str, config: &BreakerConfig) -> Result<(), ValidationError> {
    let mut errors = Vec::new();
    check_breaker(scope, config, &mut errors);
    match errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn check_breaker(scope: &str, config: &BreakerConfig, errors: &mut Vec<ValidationError>) {
    if config.failure_threshold == 0 {
        errors.push(ValidationError::ZeroThreshold { scope: scope.to_string() });
    }
    let durations = [
        ("timeout_ms", config.timeout_ms),
        ("reset_timeout_ms", config.reset_timeout_ms),
        ("monitoring_period_ms", config.monitoring_period_ms),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { scope: scope.to_string(), field });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BreakerOverrides;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GuardConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = GuardConfig::default();
        config.defaults.timeout_ms = Some(0);
        config.services.insert(
            "email".into(),
            BreakerOverrides::default().failure_threshold(0),
        );
        config.observability.metrics_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();

        assert!(errors.contains(&ValidationError::ZeroDuration {
            scope: "defaults".into(),
            field: "timeout_ms",
        }));
        assert!(errors.contains(&ValidationError::ZeroThreshold {
            scope: "services.email".into(),
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidAddress { .. })));
    }

    #[test]
    fn test_admin_checks_only_when_enabled() {
        let mut config = GuardConfig::default();
        config.admin.api_key.clear();
        assert!(validate_config(&config).is_ok());

        config.admin.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingApiKey]);
    }

    #[test]
    fn test_single_breaker_check() {
        assert!(validate_breaker("services.ai", &BreakerConfig::default()).is_ok());

        let config = BreakerConfig { reset_timeout_ms: 0, ..BreakerConfig::default() };
        assert_eq!(
            validate_breaker("services.ai", &config),
            Err(ValidationError::ZeroDuration {
                scope: "services.ai".into(),
                field: "reset_timeout_ms",
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::ZeroDuration { scope: "services.ai".into(), field: "timeout_ms" };
        assert_eq!(err.to_string(), "services.ai: timeout_ms must be greater than 0");
    }
}

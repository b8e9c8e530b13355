//! Error taxonomy for protected calls.

use std::time::Duration;

use thiserror::Error;

use crate::config::ValidationError;

/// Why the primary path did not produce a value.
#[derive(Debug, Error)]
pub enum Rejection<E> {
    /// The circuit was open and the cooldown had not elapsed; nothing was called.
    #[error("circuit is open")]
    CircuitOpen,

    /// The primary operation did not finish within the breaker timeout.
    #[error("operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The primary operation returned an error.
    #[error("operation failed: {0}")]
    Operation(E),
}

/// Error returned by a protected call.
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// No fallback was supplied and the primary was short-circuited or failed.
    #[error("service '{service}' unavailable: {cause}")]
    Unavailable { service: String, cause: Rejection<E> },

    /// The primary path failed and so did the fallback.
    #[error("service '{service}' failed ({cause}) and fallback also failed: {fallback}")]
    FallbackFailed {
        service: String,
        cause: Rejection<E>,
        fallback: E,
    },
}

impl<E> BreakerError<E> {
    pub fn service(&self) -> &str {
        match self {
            BreakerError::Unavailable { service, .. } => service,
            BreakerError::FallbackFailed { service, .. } => service,
        }
    }

    pub fn cause(&self) -> &Rejection<E> {
        match self {
            BreakerError::Unavailable { cause, .. } => cause,
            BreakerError::FallbackFailed { cause, .. } => cause,
        }
    }

    /// True when the primary operation was never invoked.
    pub fn is_short_circuit(&self) -> bool {
        matches!(self.cause(), Rejection::CircuitOpen)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause(), Rejection::Timeout(_))
    }

    pub fn is_fallback_failure(&self) -> bool {
        matches!(self, BreakerError::FallbackFailed { .. })
    }
}

/// Errors from the breaker registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("invalid settings for service '{service}': {source}")]
    InvalidSettings {
        service: String,
        #[source]
        source: ValidationError,
    },
}

/// Result type for protected calls.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: BreakerError<String> = BreakerError::Unavailable {
            service: "email".into(),
            cause: Rejection::Timeout(Duration::from_millis(50)),
        };
        assert_eq!(err.to_string(), "service 'email' unavailable: operation timed out after 50ms");
        assert!(err.is_timeout());
        assert!(!err.is_short_circuit());

        let err: BreakerError<String> = BreakerError::FallbackFailed {
            service: "ai".into(),
            cause: Rejection::Operation("model overloaded".into()),
            fallback: "no cached answer".into(),
        };
        assert_eq!(
            err.to_string(),
            "service 'ai' failed (operation failed: model overloaded) and fallback also failed: no cached answer"
        );
        assert!(err.is_fallback_failure());
        assert_eq!(err.service(), "ai");
    }
}

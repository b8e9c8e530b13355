//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a protected call against the breaker timeout
//! - Keep timeout errors distinct from operation errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - On expiry the operation future is dropped, which cancels it at its next
//!   await point; work it already handed to a spawned task keeps running

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::resilience::error::Rejection;

/// Run `operation` with a deadline, folding both failure kinds into a [`Rejection`].
pub async fn race<T, E, Fut>(limit: Duration, operation: Fut) -> Result<T, Rejection<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match timeout(limit, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Rejection::Operation(e)),
        Err(_) => Err(Rejection::Timeout(limit)),
    }
}

//! Shared utilities for integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use circuit_guard::config::BreakerConfig;

/// Counts how many times the protected operation actually ran.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    #[allow(dead_code)]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// An operation that records the call and succeeds with `value`.
    #[allow(dead_code)]
    pub fn ok<T: Send + 'static>(
        &self,
        value: T,
    ) -> impl FnOnce() -> std::future::Ready<Result<T, String>> {
        let counter = self.0.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value))
        }
    }

    /// An operation that records the call and fails.
    #[allow(dead_code)]
    pub fn err<T>(&self, message: &str) -> impl FnOnce() -> std::future::Ready<Result<T, String>> {
        let counter = self.0.clone();
        let message = message.to_string();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Err(message))
        }
    }
}

/// Breaker settings with short timings for tests.
#[allow(dead_code)]
pub fn fast_config(failure_threshold: u32) -> BreakerConfig {
    BreakerConfig {
        failure_threshold,
        timeout_ms: 50,
        reset_timeout_ms: 100,
        monitoring_period_ms: 10_000,
    }
}

/// Sleep past a 100ms cooldown.
#[allow(dead_code)]
pub async fn wait_for_cooldown() {
    tokio::time::sleep(Duration::from_millis(110)).await;
}

//! Registry of named circuit breakers.
//!
//! # Responsibilities
//! - Hand out one breaker per external dependency, created on first lookup
//! - Resolve per-service settings from configuration at creation time
//! - Aggregate state and health across all breakers
//!
//! # Design Decisions
//! - No global instance; construct once at startup and share via `Arc`
//! - First call wins: settings passed for an already-registered name are ignored
//! - Lazy creation goes through the map's entry API, so racing lookups for an
//!   unseen name create a single breaker
//! - Config reloads swap the policy; existing breakers keep their settings

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;

use crate::config::{validate_breaker, BreakerConfig, BreakerOverrides, GuardConfig};
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::error::RegistryError;
use crate::resilience::state::BreakerSnapshot;

/// Settings layers used when a breaker is created.
#[derive(Debug, Clone, Default)]
struct BreakerPolicy {
    defaults: BreakerOverrides,
    services: BTreeMap<String, BreakerOverrides>,
}

impl BreakerPolicy {
    fn from_config(config: &GuardConfig) -> Self {
        Self {
            defaults: config.defaults,
            services: config.services.clone(),
        }
    }

    fn resolve(&self, name: &str, overrides: Option<&BreakerOverrides>) -> BreakerConfig {
        let mut config = BreakerConfig::registry_default().merged(&self.defaults);
        if let Some(service) = self.services.get(name) {
            config = config.merged(service);
        }
        if let Some(overrides) = overrides {
            config = config.merged(overrides);
        }
        config
    }
}

/// Overall health across every registered breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

/// A breaker that is open or half-open.
#[derive(Debug, Clone, Serialize)]
pub struct UnhealthyService {
    pub name: String,
    pub snapshot: BreakerSnapshot,
}

/// Health partition of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub overall: OverallStatus,
    pub healthy: Vec<String>,
    pub unhealthy: Vec<UnhealthyService>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.overall == OverallStatus::Healthy
    }
}

/// Process-wide registry mapping service names to breakers.
#[derive(Debug)]
pub struct CircuitBreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    policy: ArcSwap<BreakerPolicy>,
}

impl CircuitBreakerManager {
    /// Create an empty registry using the registry defaults.
    pub fn new() -> Self {
        Self {
            breakers: DashMap::new(),
            policy: ArcSwap::from_pointee(BreakerPolicy::default()),
        }
    }

    /// Create an empty registry honouring `[defaults]` and `[services.*]`.
    pub fn from_config(config: &GuardConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            policy: ArcSwap::from_pointee(BreakerPolicy::from_config(config)),
        }
    }

    /// Replace the settings used for breakers created from now on.
    pub fn update_policy(&self, config: &GuardConfig) {
        self.policy.store(Arc::new(BreakerPolicy::from_config(config)));
        tracing::info!(
            services = config.services.len(),
            "Circuit breaker policy updated; applies to newly created breakers"
        );
    }

    /// Return the breaker for `name`, creating it on first use.
    ///
    /// Settings are validated only when the breaker is created.
    pub fn get_breaker(
        &self,
        name: &str,
        overrides: Option<BreakerOverrides>,
    ) -> Result<Arc<CircuitBreaker>, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyServiceName);
        }

        if let Some(existing) = self.breakers.get(name) {
            if overrides.is_some_and(|o| !o.is_empty()) {
                tracing::debug!(service = %name, "Breaker already registered, ignoring overrides");
            }
            return Ok(existing.value().clone());
        }

        let config = self.policy.load().resolve(name, overrides.as_ref());
        validate_breaker(&format!("services.{}", name), &config).map_err(|source| {
            RegistryError::InvalidSettings {
                service: name.to_string(),
                source,
            }
        })?;

        let breaker = self
            .breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(
                    service = %name,
                    failure_threshold = config.failure_threshold,
                    timeout_ms = config.timeout_ms,
                    reset_timeout_ms = config.reset_timeout_ms,
                    "Circuit breaker registered"
                );
                Arc::new(CircuitBreaker::new(name, config))
            })
            .value()
            .clone();

        Ok(breaker)
    }

    /// Snapshot of every registered breaker, keyed by service name.
    pub fn get_all_states(&self) -> BTreeMap<String, BreakerSnapshot> {
        self.all_breakers()
            .into_iter()
            .map(|breaker| (breaker.name().to_string(), breaker.snapshot()))
            .collect()
    }

    /// Split breakers into healthy (closed) and unhealthy (open or half-open).
    pub fn get_health_status(&self) -> HealthReport {
        let mut healthy = Vec::new();
        let mut unhealthy = Vec::new();

        for (name, snapshot) in self.get_all_states() {
            if snapshot.is_healthy() {
                healthy.push(name);
            } else {
                unhealthy.push(UnhealthyService { name, snapshot });
            }
        }

        let overall = if unhealthy.is_empty() {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        };

        HealthReport {
            overall,
            healthy,
            unhealthy,
        }
    }

    /// Reset every registered breaker to closed.
    pub fn reset_all(&self) {
        let breakers = self.all_breakers();
        for breaker in &breakers {
            breaker.reset();
        }
        tracing::info!(count = breakers.len(), "All circuit breakers reset");
    }

    /// Reset one breaker. Returns false if the name was never registered.
    pub fn reset(&self, name: &str) -> bool {
        match self.breakers.get(name).map(|r| r.value().clone()) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Registered service names, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    // Clone the Arcs out so no shard lock is held while breakers are touched.
    fn all_breakers(&self) -> Vec<Arc<CircuitBreaker>> {
        self.breakers.iter().map(|r| r.value().clone()).collect()
    }
}

impl Default for CircuitBreakerManager {
    fn default() -> Self {
        Self::new()
    }
}

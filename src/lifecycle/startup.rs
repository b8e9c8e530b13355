//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (config reload, admin API)
//! - Wait for a stop signal and shut everything down
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Services named in config are registered up front so they show in the
//!   admin API before their first call
//! - The admin listener starts last

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::watcher::ConfigWatcher;
use crate::config::GuardConfig;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::resilience::CircuitBreakerManager;

/// Fatal errors while bringing the daemon up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind admin API on {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
}

/// Build the registry described by `config`, with configured services pre-registered.
pub fn build_manager(config: &GuardConfig) -> Arc<CircuitBreakerManager> {
    let manager = Arc::new(CircuitBreakerManager::from_config(config));
    for name in config.services.keys() {
        if let Err(e) = manager.get_breaker(name, None) {
            tracing::warn!(service = %name, error = %e, "Skipping configured service");
        }
    }
    manager
}

/// Run the daemon until SIGINT/SIGTERM.
pub async fn run(config: GuardConfig, config_path: Option<&Path>) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let manager = build_manager(&config);
    let shutdown = Shutdown::new();

    // Dropping the watcher stops it, so it lives for the whole run.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            tokio::spawn(apply_config_updates(manager.clone(), updates, shutdown.subscribe()));
            Some(handle)
        }
        None => None,
    };

    let admin = if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address)
            .await
            .map_err(|source| StartupError::Bind {
                address: config.admin.bind_address.clone(),
                source,
            })?;
        tracing::info!(address = %config.admin.bind_address, "Admin API listening");

        let router = setup_admin_router(AdminState::new(manager.clone(), &config.admin.api_key));
        let stop = shutdown.signalled();
        Some(tokio::spawn(async move {
            axum::serve(listener, router).with_graceful_shutdown(stop).await
        }))
    } else {
        tracing::info!("Admin API disabled");
        None
    };

    tracing::info!(services = manager.len(), "circuit-guard running");
    signals::shutdown_signal().await;
    shutdown.trigger();

    if let Some(handle) = admin {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Admin API stopped with error"),
            Err(e) => tracing::error!(error = %e, "Admin API task panicked"),
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Apply reloaded configs to the registry until shutdown.
async fn apply_config_updates(
    manager: Arc<CircuitBreakerManager>,
    mut updates: mpsc::UnboundedReceiver<GuardConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(config) = updates.recv() => manager.update_policy(&config),
            _ = shutdown.recv() => break,
            else => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerOverrides;

    #[test]
    fn test_configured_services_preregistered() {
        let mut config = GuardConfig::default();
        config.services.insert("ai".into(), BreakerOverrides::default().failure_threshold(3));
        config.services.insert("kv".into(), BreakerOverrides::default().failure_threshold(10));

        let manager = build_manager(&config);
        assert_eq!(manager.service_names(), vec!["ai", "kv"]);
        assert_eq!(manager.get_breaker("kv", None).unwrap().config().failure_threshold, 10);
    }

    #[tokio::test]
    async fn test_config_updates_applied_until_shutdown() {
        let manager = Arc::new(CircuitBreakerManager::new());
        let shutdown = Shutdown::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(apply_config_updates(manager.clone(), rx, shutdown.subscribe()));

        let mut config = GuardConfig::default();
        config.defaults.failure_threshold = Some(6);
        tx.send(config).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(manager.get_breaker("email", None).unwrap().config().failure_threshold, 6);

        shutdown.trigger();
        task.await.unwrap();
    }
}

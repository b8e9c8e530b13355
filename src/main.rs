//! circuit-guard daemon.
//!
//! Hosts the breaker registry with its admin API and Prometheus metrics.
//!
//! ```text
//!   config file ──▶ loader ──▶ GuardConfig ──▶ CircuitBreakerManager ◀── admin API (/admin/*)
//!        ▲                                              │
//!        └──── watcher (hot reload of breaker policy) ──┘──▶ metrics (/metrics)
//! ```

use std::path::PathBuf;

use clap::Parser;

use circuit_guard::config::{load_config, GuardConfig};
use circuit_guard::lifecycle::startup;
use circuit_guard::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(about = "Circuit breaker registry for external service calls", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "circuit-guard.toml")]
    config: PathBuf,

    /// Do not reload the configuration when the file changes.
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_exists = args.config.exists();
    let config = if file_exists {
        load_config(&args.config)?
    } else {
        GuardConfig::default()
    };

    init_logging(&config.observability);
    tracing::info!("circuit-guard v{} starting", env!("CARGO_PKG_VERSION"));

    if file_exists {
        tracing::info!(
            path = %args.config.display(),
            services = config.services.len(),
            admin_enabled = config.admin.enabled,
            "Configuration loaded"
        );
    } else {
        tracing::warn!(path = %args.config.display(), "Config file not found, using defaults");
    }

    let watch_path = (file_exists && !args.no_watch).then_some(args.config.as_path());
    startup::run(config, watch_path).await?;
    Ok(())
}

//! boss-scout daemon: restores tracked state and runs respawn reconciliation.

use anyhow::{Context, Result};
use scout_core::config::ScoutConfig;
use scout_daemon::daemon::Daemon;
use tracing::{info, warn};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let env_loaded = dotenv::dotenv().is_ok();

    let (config, config_error) = match ScoutConfig::load() {
        Ok(config) => (config, None),
        Err(e) => (ScoutConfig::default(), Some(e)),
    };
    scout_telemetry::logging::init_from("scout-daemon", &config.general);
    if let Some(e) = config_error {
        warn!(error = %e, "failed to load config, using defaults");
    }
    if env_loaded {
        info!("loaded .env");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "boss-scout daemon starting");

    let daemon = Daemon::new(config)
        .await
        .context("failed to initialise daemon")?;

    let shutdown = daemon.shutdown_handle();

    // Wire ctrl-c to trigger graceful shutdown.
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        info!("ctrl-c received, initiating shutdown");
        shutdown.trigger();
    });

    if let Err(e) = daemon.run().await {
        tracing::error!(error = %e, "daemon execution failed");
        return Err(e);
    }

    Ok(())
}

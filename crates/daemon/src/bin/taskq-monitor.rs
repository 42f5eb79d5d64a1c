//! taskq monitor daemon - dashboard and queue depth JSON

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::info;

use taskq_api_http::{monitor_router, HttpServer, HttpServerConfig};
use taskq_core::application::{QueueEngine, QueueMonitor};
use taskq_daemon::{connect_store, init_logging, DaemonConfig, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_logging(config.log_format, config.log_dir.as_deref(), "taskq-monitor")?;

    info!("taskq monitor v{} starting...", VERSION);

    let store = connect_store(&config.store_url)
        .await
        .with_context(|| format!("Failed to connect to store at {}", config.store_url))?;

    let monitor = QueueMonitor::new(QueueEngine::new(store));

    let server = HttpServer::new(
        HttpServerConfig {
            addr: config.monitor_addr,
        },
        monitor_router(Arc::new(monitor)),
    );
    let handle = server
        .start()
        .await
        .map_err(|e| anyhow!("Monitor server start failed: {}", e))?;

    info!(addr = %handle.local_addr(), "Monitor dashboard ready");
    info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");
    handle
        .stop()
        .await
        .map_err(|e| anyhow!("Monitor server stop failed: {}", e))?;

    info!("Shutdown complete.");
    Ok(())
}

//! taskq producer daemon - accepts `POST /task` submissions

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tracing::info;

use taskq_api_http::{producer_router, HttpServer, HttpServerConfig};
use taskq_core::application::{ProducerService, QueueEngine};
use taskq_core::port::id_provider::TimestampIdProvider;
use taskq_core::port::time_provider::SystemTimeProvider;
use taskq_daemon::{connect_store, init_logging, DaemonConfig, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_logging(config.log_format, config.log_dir.as_deref(), "taskq-producer")?;

    info!("taskq producer v{} starting...", VERSION);

    let store = connect_store(&config.store_url)
        .await
        .with_context(|| format!("Failed to connect to store at {}", config.store_url))?;

    let producer = ProducerService::new(
        QueueEngine::new(store),
        Arc::new(TimestampIdProvider::new()),
        Arc::new(SystemTimeProvider),
    );

    let server = HttpServer::new(
        HttpServerConfig {
            addr: config.producer_addr,
        },
        producer_router(Arc::new(producer)),
    );
    let handle = server
        .start()
        .await
        .map_err(|e| anyhow!("Producer server start failed: {}", e))?;

    info!(addr = %handle.local_addr(), "Producer API ready");
    info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");
    handle
        .stop()
        .await
        .map_err(|e| anyhow!("Producer server stop failed: {}", e))?;

    info!("Shutdown complete.");
    Ok(())
}

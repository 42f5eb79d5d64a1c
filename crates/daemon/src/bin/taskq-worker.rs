//! taskq worker daemon
//!
//! Runs `TASKQ_WORKER_CONCURRENCY` workers against the configured store.
//! Each worker owns its own store connection because a blocking claim holds
//! the connection for its whole wait.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use taskq_core::application::{shutdown_channel, QueueEngine, RetryPolicy, Worker, WorkerConfig};
use taskq_core::port::{ClaimTimeout, TaskExecutor};
use taskq_daemon::{connect_store, init_logging, DaemonConfig, VERSION};
use taskq_infra_system::SimulatedExecutor;

/// How long in-flight tasks get to finish after Ctrl+C
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    let _log_guard = init_logging(config.log_format, config.log_dir.as_deref(), "taskq-worker")?;

    info!("taskq worker v{} starting...", VERSION);

    let executor: Arc<dyn TaskExecutor> = Arc::new(
        SimulatedExecutor::new(config.sim_latency, config.sim_failure_rate)
            .context("Invalid simulated executor settings")?,
    );
    let retry_policy = RetryPolicy::new(config.max_retries);
    let worker_config = WorkerConfig {
        claim_timeout: ClaimTimeout::Infinite,
        reconnect_backoff: config.reconnect_backoff,
        execution_timeout: config.execution_timeout,
    };

    let (shutdown_tx, _) = shutdown_channel();
    let mut handles = Vec::with_capacity(config.worker_concurrency);

    for i in 0..config.worker_concurrency {
        let store = connect_store(&config.store_url)
            .await
            .with_context(|| format!("Failed to connect to store at {}", config.store_url))?;

        let worker = Worker::new(
            QueueEngine::new(store),
            executor.clone(),
            retry_policy,
            worker_config.clone(),
        )
        .with_name(format!("worker-{}", i));

        let token = shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            if let Err(e) = worker.run(token).await {
                error!(worker = %worker.name(), error = %e, "Worker failed");
            }
        }));
    }

    info!(
        workers = config.worker_concurrency,
        max_retries = config.max_retries,
        "System ready. Waiting for tasks..."
    );
    info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");
    shutdown_tx.shutdown();

    if tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles))
        .await
        .is_err()
    {
        warn!("Workers did not stop within the grace period");
    }

    info!("Shutdown complete.");
    Ok(())
}

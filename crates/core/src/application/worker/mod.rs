// Worker - claim / execute / resolve loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::queue_engine::QueueEngine;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{QueueName, Task, TaskId};
use crate::error::Result;
use crate::port::{ClaimTimeout, ExecutionError, TaskExecutor};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker tuning knobs
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long a claim waits for pending work. The daemon uses `Infinite`.
    pub claim_timeout: ClaimTimeout,
    /// Sleep after a store error while claiming
    pub reconnect_backoff: Duration,
    /// Per-attempt limit; overruns count as a failed attempt
    pub execution_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            claim_timeout: ClaimTimeout::Infinite,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            execution_timeout: None,
        }
    }
}

/// What one claim cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The claim timed out with nothing pending
    Idle,
    /// The claimed item could not be parsed and was dropped
    Discarded,
    /// Executed successfully and removed from processing
    Completed { task_id: TaskId },
    /// Failed and re-enqueued to pending
    Retried { task_id: TaskId, retry_count: u32 },
    /// Failed at the retry cap and moved to dead-letter
    Quarantined { task_id: TaskId, retry_count: u32 },
    /// Failed, removed from processing, but the re-enqueue failed
    Lost { task_id: TaskId },
}

/// Worker processes tasks from the pending queue.
///
/// States: Claiming → Deserializing → Executing → Resolving → Claiming.
///
/// Known gap: if the process dies while a task is Executing, its item stays
/// in the processing queue forever. Nothing in this crate reaps it.
pub struct Worker {
    name: String,
    engine: QueueEngine,
    executor: Arc<dyn TaskExecutor>,
    retry_policy: RetryPolicy,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        engine: QueueEngine,
        executor: Arc<dyn TaskExecutor>,
        retry_policy: RetryPolicy,
        config: WorkerConfig,
    ) -> Self {
        Self {
            name: DEFAULT_WORKER_NAME.to_string(),
            engine,
            executor,
            retry_policy,
            config,
        }
    }

    /// Name shown in log lines
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run worker loop until shutdown.
    ///
    /// Claim errors are retried forever after `reconnect_backoff`; this is the
    /// only place with automatic backoff. A claim interrupted by shutdown can
    /// at worst leave its item in processing, exactly like a crash.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(worker = %self.name, "Worker started. Waiting for tasks...");
        loop {
            if shutdown.is_shutdown() {
                info!(worker = %self.name, "Worker shutting down");
                break;
            }

            let claimed = tokio::select! {
                res = self.claim() => res,
                _ = shutdown.wait() => {
                    info!(worker = %self.name, "Worker interrupted while claiming");
                    break;
                }
            };

            match claimed {
                Ok(Some(raw)) => {
                    self.handle_claimed(raw).await;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(
                        worker = %self.name,
                        error = %e,
                        backoff_ms = self.config.reconnect_backoff.as_millis() as u64,
                        "Error claiming task from store"
                    );
                    tokio::select! {
                        _ = sleep(self.config.reconnect_backoff) => {},
                        _ = shutdown.wait() => {
                            info!(worker = %self.name, "Worker interrupted during backoff");
                            break;
                        }
                    }
                }
            }
        }
        info!(worker = %self.name, "Worker stopped");
        Ok(())
    }

    /// Run exactly one claim cycle.
    ///
    /// Store errors while claiming are returned; everything after a
    /// successful claim is handled here and reported in the outcome.
    pub async fn process_next(&self) -> Result<WorkerOutcome> {
        match self.claim().await? {
            Some(raw) => Ok(self.handle_claimed(raw).await),
            None => Ok(WorkerOutcome::Idle),
        }
    }

    async fn claim(&self) -> Result<Option<Vec<u8>>> {
        self.engine
            .claim_transfer(
                QueueName::Pending,
                QueueName::Processing,
                self.config.claim_timeout,
            )
            .await
    }

    async fn handle_claimed(&self, raw: Vec<u8>) -> WorkerOutcome {
        let task = match Task::from_bytes(&raw) {
            Ok(task) => task,
            Err(e) => {
                // Corrupt entries are dropped on purpose
                error!(
                    worker = %self.name,
                    error = %e,
                    raw = %String::from_utf8_lossy(&raw),
                    "Failed to parse task, discarding"
                );
                self.remove_from_processing(&raw, "<malformed>").await;
                return WorkerOutcome::Discarded;
            }
        };

        info!(
            worker = %self.name,
            task_id = %task.id,
            task_type = %task.task_type,
            retry_count = task.retry_count,
            "Processing task"
        );

        let outcome = self.execute(&task).await;
        if let Err(e) = &outcome {
            warn!(worker = %self.name, task_id = %task.id, error = %e, "Task failed");
        }

        self.resolve(&raw, &task, outcome).await
    }

    /// Run the executor in its own tokio task so a panic cannot take the
    /// worker down with it
    async fn execute(&self, task: &Task) -> std::result::Result<(), ExecutionError> {
        let executor = Arc::clone(&self.executor);
        let task_for_exec = task.clone();
        let handle = tokio::spawn(async move { executor.execute(&task_for_exec).await });

        let joined = match self.config.execution_timeout {
            Some(limit) => {
                let abort = handle.abort_handle();
                match tokio::time::timeout(limit, handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        abort.abort();
                        return Err(ExecutionError::Timeout(limit));
                    }
                }
            }
            None => handle.await,
        };

        match joined {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                let msg = panic_message(join_err.into_panic());
                error!(worker = %self.name, task_id = %task.id, panic_msg = %msg, "Executor panicked");
                Err(ExecutionError::Panicked(msg))
            }
            Err(join_err) => Err(ExecutionError::Failed(format!("execution cancelled: {}", join_err))),
        }
    }

    /// Clear the processing copy, then route by the retry policy.
    ///
    /// Re-enqueue failures are logged, not retried: the processing copy is
    /// already gone, so the task is lost.
    async fn resolve(
        &self,
        raw: &[u8],
        task: &Task,
        outcome: std::result::Result<(), ExecutionError>,
    ) -> WorkerOutcome {
        self.remove_from_processing(raw, &task.id).await;

        let (target, routed) = match self.retry_policy.decide(task, &outcome) {
            RetryDecision::Complete => {
                info!(worker = %self.name, task_id = %task.id, "Task done");
                return WorkerOutcome::Completed {
                    task_id: task.id.clone(),
                };
            }
            RetryDecision::Retry(next) => (QueueName::Pending, next),
            RetryDecision::Quarantine(same) => (QueueName::DeadLetter, same),
        };

        if let Err(e) = self.engine.enqueue_task(target, &routed).await {
            error!(
                worker = %self.name,
                task_id = %routed.id,
                queue = %target,
                error = %e,
                "Failed to re-enqueue task after removal from processing; task lost"
            );
            return WorkerOutcome::Lost {
                task_id: routed.id,
            };
        }

        match target {
            QueueName::Pending => {
                info!(
                    worker = %self.name,
                    task_id = %routed.id,
                    retry_count = routed.retry_count,
                    "Retrying task"
                );
                WorkerOutcome::Retried {
                    task_id: routed.id,
                    retry_count: routed.retry_count,
                }
            }
            _ => {
                warn!(
                    worker = %self.name,
                    task_id = %routed.id,
                    retry_count = routed.retry_count,
                    "Task moved to dead-letter queue"
                );
                WorkerOutcome::Quarantined {
                    task_id: routed.id,
                    retry_count: routed.retry_count,
                }
            }
        }
    }

    async fn remove_from_processing(&self, raw: &[u8], task_id: &str) {
        match self
            .engine
            .remove_first_match(QueueName::Processing, raw)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(
                worker = %self.name,
                task_id = %task_id,
                "Claimed item was not found in processing queue"
            ),
            Err(e) => error!(
                worker = %self.name,
                task_id = %task_id,
                error = %e,
                "Failed to remove item from processing queue"
            ),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ordered_store::mocks::InMemoryStore;
    use crate::port::task_executor::mocks::{MockBehavior, MockTaskExecutor};
    use chrono::Utc;
    use tokio_test::assert_ok;

    const SHORT: ClaimTimeout = ClaimTimeout::After(Duration::from_millis(20));

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            claim_timeout: SHORT,
            reconnect_backoff: Duration::from_millis(10),
            execution_timeout: None,
        }
    }

    fn setup(executor: MockTaskExecutor) -> (Arc<InMemoryStore>, QueueEngine, Worker, Arc<MockTaskExecutor>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = QueueEngine::new(store.clone());
        let executor = Arc::new(executor);
        let worker = Worker::new(
            engine.clone(),
            executor.clone(),
            RetryPolicy::default(),
            test_config(),
        );
        (store, engine, worker, executor)
    }

    async fn depths(engine: &QueueEngine) -> (u64, u64, u64) {
        (
            engine.length(QueueName::Pending).await.unwrap(),
            engine.length(QueueName::Processing).await.unwrap(),
            engine.length(QueueName::DeadLetter).await.unwrap(),
        )
    }

    #[tokio::test]
    async fn test_success_leaves_no_trace() {
        let (_store, engine, worker, executor) = setup(MockTaskExecutor::new_success());
        let task = Task::new("t1", "Email", "x", Utc::now());
        engine.enqueue_task(QueueName::Pending, &task).await.unwrap();

        let outcome = worker.process_next().await.unwrap();

        assert_eq!(outcome, WorkerOutcome::Completed { task_id: "t1".into() });
        assert_eq!(depths(&engine).await, (0, 0, 0));
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn test_always_failing_task_ends_in_dead_letter() {
        let (store, engine, worker, executor) = setup(MockTaskExecutor::new_fail("boom"));
        let task = Task::new("t1", "Email", "x", Utc::now());
        engine.enqueue_task(QueueName::Pending, &task).await.unwrap();

        for expected in 1..=3 {
            let outcome = worker.process_next().await.unwrap();
            assert_eq!(
                outcome,
                WorkerOutcome::Retried { task_id: "t1".into(), retry_count: expected }
            );
            assert_eq!(depths(&engine).await, (1, 0, 0));
        }

        let outcome = worker.process_next().await.unwrap();
        assert_eq!(
            outcome,
            WorkerOutcome::Quarantined { task_id: "t1".into(), retry_count: 3 }
        );
        assert_eq!(depths(&engine).await, (0, 0, 1));
        assert_eq!(executor.call_count(), 4);

        let dead = Task::from_bytes(&store.items(QueueName::DeadLetter)[0]).unwrap();
        assert_eq!(dead.retry_count, 3);
        assert_eq!(dead.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_retry_goes_to_tail_behind_newer_tasks() {
        let (store, engine, worker, _executor) = setup(MockTaskExecutor::new(MockBehavior::FailTimes(1)));
        engine
            .enqueue_task(QueueName::Pending, &Task::new("first", "Email", "", Utc::now()))
            .await
            .unwrap();
        engine
            .enqueue_task(QueueName::Pending, &Task::new("second", "Email", "", Utc::now()))
            .await
            .unwrap();

        worker.process_next().await.unwrap();

        let ids: Vec<String> = store
            .items(QueueName::Pending)
            .iter()
            .map(|raw| Task::from_bytes(raw).unwrap().id)
            .collect();
        assert_eq!(ids, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_malformed_item_is_discarded() {
        let (_store, engine, worker, executor) = setup(MockTaskExecutor::new_success());
        engine.enqueue(QueueName::Pending, b"{not json").await.unwrap();

        let outcome = worker.process_next().await.unwrap();

        assert_eq!(outcome, WorkerOutcome::Discarded);
        assert_eq!(depths(&engine).await, (0, 0, 0));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_idle_when_nothing_pending() {
        let (_store, _engine, worker, _executor) = setup(MockTaskExecutor::new_success());
        assert_eq!(worker.process_next().await.unwrap(), WorkerOutcome::Idle);
    }

    #[tokio::test]
    async fn test_panicking_executor_counts_as_failure() {
        let (_store, engine, worker, _executor) =
            setup(MockTaskExecutor::new_panic_inducing("executor exploded"));
        engine
            .enqueue_task(QueueName::Pending, &Task::new("t1", "Email", "", Utc::now()))
            .await
            .unwrap();

        let outcome = worker.process_next().await.unwrap();

        assert_eq!(outcome, WorkerOutcome::Retried { task_id: "t1".into(), retry_count: 1 });
        assert_eq!(depths(&engine).await, (1, 0, 0));
    }

    #[tokio::test]
    async fn test_execution_timeout_counts_as_failure() {
        let store = Arc::new(InMemoryStore::new());
        let engine = QueueEngine::new(store);
        let worker = Worker::new(
            engine.clone(),
            Arc::new(MockTaskExecutor::new(MockBehavior::Hang)),
            RetryPolicy::default(),
            WorkerConfig {
                execution_timeout: Some(Duration::from_millis(30)),
                ..test_config()
            },
        );
        engine
            .enqueue_task(QueueName::Pending, &Task::new("t1", "Email", "", Utc::now()))
            .await
            .unwrap();

        let outcome = worker.process_next().await.unwrap();

        assert_eq!(outcome, WorkerOutcome::Retried { task_id: "t1".into(), retry_count: 1 });
        assert_eq!(depths(&engine).await, (1, 0, 0));
    }

    #[tokio::test]
    async fn test_failed_reenqueue_loses_task() {
        let (store, engine, worker, _executor) = setup(MockTaskExecutor::new_fail("boom"));
        engine
            .enqueue_task(QueueName::Pending, &Task::new("t1", "Email", "", Utc::now()))
            .await
            .unwrap();
        store.set_reject_appends(true);

        let outcome = worker.process_next().await.unwrap();

        assert_eq!(outcome, WorkerOutcome::Lost { task_id: "t1".into() });
        store.set_reject_appends(false);
        assert_eq!(depths(&engine).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_claim_error_is_returned() {
        let (store, _engine, worker, _executor) = setup(MockTaskExecutor::new_success());
        store.set_offline(true);
        let err = worker.process_next().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_run_recovers_after_store_outage() {
        let (store, engine, worker, executor) = setup(MockTaskExecutor::new_success());
        engine
            .enqueue_task(QueueName::Pending, &Task::new("t1", "Email", "", Utc::now()))
            .await
            .unwrap();
        store.set_offline(true);

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(executor.call_count(), 0);
        store.set_offline(false);

        for _ in 0..50 {
            if executor.call_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(executor.call_count(), 1);

        shutdown_tx.shutdown();
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "Worker should shutdown within 2 seconds");
        assert_ok!(result.unwrap().unwrap());
        assert_eq!(depths(&engine).await, (0, 0, 0));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_infinite_claim() {
        let store = Arc::new(InMemoryStore::new());
        let worker = Worker::new(
            QueueEngine::new(store),
            Arc::new(MockTaskExecutor::new_success()),
            RetryPolicy::default(),
            WorkerConfig::default(),
        );

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let handle = tokio::spawn(async move { worker.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_killed_worker_leaves_task_in_processing() {
        let (_store, engine, worker, _executor) = setup(MockTaskExecutor::new(MockBehavior::Hang));
        engine
            .enqueue_task(QueueName::Pending, &Task::new("t1", "Email", "", Utc::now()))
            .await
            .unwrap();

        let handle = tokio::spawn(async move { worker.process_next().await });
        for _ in 0..50 {
            if engine.length(QueueName::Processing).await.unwrap() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.abort();
        let _ = handle.await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        // Nothing recovers it
        assert_eq!(depths(&engine).await, (0, 1, 0));
    }
}

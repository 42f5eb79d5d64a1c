// Application Layer - Use Cases and Business Logic

pub mod monitor;
pub mod producer;
pub mod queue_engine;
pub mod retry;
pub mod worker;

// Re-exports
pub use monitor::{QueueMonitor, QueueStats, StoreStatus};
pub use producer::{ProducerService, SubmitRequest};
pub use queue_engine::QueueEngine;
pub use retry::{RetryDecision, RetryPolicy};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker, WorkerConfig, WorkerOutcome};

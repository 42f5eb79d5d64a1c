// Domain Layer - Pure business logic and entities

pub mod error;
pub mod queue;
pub mod task;

// Re-exports
pub use error::DomainError;
pub use queue::QueueName;
pub use task::{Task, TaskId, DEFAULT_TASK_TYPE};

// Task Executor Port
// The domain-specific work function, supplied by the surrounding application

use crate::domain::Task;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Execution errors. Every variant is routed through the retry policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Task failed: {0}")]
    Failed(String),

    #[error("Execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("Executor panicked: {0}")]
    Panicked(String),
}

/// Task Executor trait
///
/// Implementations:
/// - SimulatedExecutor (infra-system): fixed latency, random failures
/// - mocks::MockTaskExecutor: scripted outcomes for tests
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run one attempt of the task. Must return within a bounded duration.
    async fn execute(&self, task: &Task) -> Result<(), ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Mock executor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Always fail with message
        Fail(String),
        /// Fail the first N calls, then succeed
        FailTimes(usize),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Never return (for crash-gap testing)
        Hang,
    }

    /// Mock Task Executor for testing
    pub struct MockTaskExecutor {
        behavior: Arc<Mutex<MockBehavior>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior: Arc::new(Mutex::new(behavior)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }
        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }
        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }
        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }
        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(&self, task: &Task) -> Result<(), ExecutionError> {
            let call = {
                let mut count = self.call_count.lock().unwrap();
                *count += 1;
                *count
            };

            let behavior = self.behavior.lock().unwrap().clone();

            match behavior {
                MockBehavior::Success => Ok(()),
                MockBehavior::Fail(msg) => Err(ExecutionError::Failed(msg)),
                MockBehavior::FailTimes(n) if call <= n => Err(ExecutionError::Failed(format!(
                    "scripted failure {} of {} for task {}",
                    call, n, task.id
                ))),
                MockBehavior::FailTimes(_) => Ok(()),
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Hang => {
                    std::future::pending::<()>().await;
                    Ok(())
                }
            }
        }
    }
}

// Retry policy
use crate::domain::Task;
use crate::port::ExecutionError;
use tracing::{info, warn};

/// Retry cap used when none is configured
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Outcome of one execution attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Succeeded, nothing to re-enqueue
    Complete,
    /// Re-enqueue to pending (retry_count already incremented)
    Retry(Task),
    /// Move to dead-letter unchanged
    Quarantine(Task),
}

/// Pure mapping from (task, execution outcome) to a routing decision.
///
/// No backoff and no jitter: a retried task goes straight back to the tail
/// of the pending queue like any fresh task.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide what happens to `task` after an attempt
    ///
    /// - success → `Complete`
    /// - failure with `retry_count < max_retries` → `Retry` with the count incremented
    /// - failure at the cap → `Quarantine` with the task unchanged
    pub fn decide(&self, task: &Task, outcome: &Result<(), ExecutionError>) -> RetryDecision {
        let Err(error) = outcome else {
            return RetryDecision::Complete;
        };

        if task.retry_count < self.max_retries {
            let next = task.next_attempt();
            info!(
                task_id = %task.id,
                retry_count = next.retry_count,
                max_retries = self.max_retries,
                error = %error,
                "Scheduling retry"
            );
            RetryDecision::Retry(next)
        } else {
            warn!(
                task_id = %task.id,
                retry_count = task.retry_count,
                max_retries = self.max_retries,
                error = %error,
                "Max retries reached, quarantining"
            );
            RetryDecision::Quarantine(task.clone())
        }
    }
}

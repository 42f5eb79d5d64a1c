// Queue Domain Model

use std::fmt;

/// The three fixed queues of the system.
///
/// Closed set: no queue is ever created dynamically. A task's serialized form
/// lives in exactly one of these at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    /// Tasks waiting for a worker
    Pending,
    /// Tasks claimed by a worker for one execution attempt
    Processing,
    /// Terminal quarantine for tasks that exhausted their retries
    DeadLetter,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [
        QueueName::Pending,
        QueueName::Processing,
        QueueName::DeadLetter,
    ];

    /// Key under which the store keeps this queue
    pub fn key(&self) -> &'static str {
        match self {
            QueueName::Pending => "tasks:pending",
            QueueName::Processing => "tasks:processing",
            QueueName::DeadLetter => "tasks:dead_letter",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Pending => "pending",
            QueueName::Processing => "processing",
            QueueName::DeadLetter => "dead-letter",
        }
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

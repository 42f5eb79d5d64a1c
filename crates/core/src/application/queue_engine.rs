// Queue Engine - translates queue names into store operations
// Owns no state; every mutation is one atomic store primitive

use crate::domain::{QueueName, Task};
use crate::error::Result;
use crate::port::{ClaimTimeout, OrderedStore};
use std::sync::Arc;
use tracing::debug;

/// Thin façade over the store. Cheap to clone.
#[derive(Clone)]
pub struct QueueEngine {
    store: Arc<dyn OrderedStore>,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn OrderedStore>) -> Self {
        Self { store }
    }

    /// Append a serialized task to the tail of `queue`
    pub async fn enqueue(&self, queue: QueueName, item: &[u8]) -> Result<()> {
        self.store.append(queue, item).await?;
        debug!(queue = %queue, bytes = item.len(), "Enqueued item");
        Ok(())
    }

    /// Serialize and enqueue a task
    pub async fn enqueue_task(&self, queue: QueueName, task: &Task) -> Result<()> {
        let item = task.to_bytes()?;
        self.enqueue(queue, &item).await
    }

    /// Atomically move the head of `from` to the tail of `to`, returning the
    /// raw item. Each item is delivered to exactly one concurrent caller.
    ///
    /// No internal retry: store failures are returned to the caller.
    pub async fn claim_transfer(
        &self,
        from: QueueName,
        to: QueueName,
        timeout: ClaimTimeout,
    ) -> Result<Option<Vec<u8>>> {
        self.store.transfer(from, to, timeout).await
    }

    /// Remove one occurrence of `item` from `queue`, matched by value
    pub async fn remove_first_match(&self, queue: QueueName, item: &[u8]) -> Result<bool> {
        self.store.remove_first(queue, item).await
    }

    /// Current depth. For observability only, never for control decisions.
    pub async fn length(&self, queue: QueueName) -> Result<u64> {
        self.store.len(queue).await
    }
}

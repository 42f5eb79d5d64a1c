// Ordered Durable Store Port (Interface)
// Three FIFO sequences keyed by QueueName with atomic primitives

use crate::domain::QueueName;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// How long `transfer` may wait for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimTimeout {
    /// Block until an item arrives
    Infinite,
    /// Give up and return `None` after the duration
    After(Duration),
}

/// Backing store for the queues.
///
/// Every method must be atomic with respect to every other caller, including
/// callers in other processes. `transfer` in particular must hand each item to
/// exactly one caller: no observer may see the item in both queues or in
/// neither.
///
/// Implementations:
/// - SqliteOrderedStore (infra-sqlite)
/// - RedisOrderedStore (infra-redis)
/// - mocks::InMemoryStore (tests)
#[async_trait]
pub trait OrderedStore: Send + Sync {
    /// Append an item to the tail of `queue`
    async fn append(&self, queue: QueueName, item: &[u8]) -> Result<()>;

    /// Pop the head of `from` and append it to the tail of `to` in one step.
    ///
    /// Blocks until `from` is non-empty or the timeout elapses. Returns
    /// `Ok(None)` only on timeout.
    async fn transfer(
        &self,
        from: QueueName,
        to: QueueName,
        timeout: ClaimTimeout,
    ) -> Result<Option<Vec<u8>>>;

    /// Remove the occurrence of `item` nearest the head of `queue`.
    /// Returns whether anything was removed.
    async fn remove_first(&self, queue: QueueName, item: &[u8]) -> Result<bool>;

    /// Current number of items in `queue`
    async fn len(&self, queue: QueueName) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// In-memory store with real blocking semantics and fault injection
    #[derive(Default)]
    pub struct InMemoryStore {
        queues: Mutex<HashMap<QueueName, VecDeque<Vec<u8>>>>,
        notify: Notify,
        offline: AtomicBool,
        reject_appends: AtomicBool,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every call fail with a store error (simulated outage)
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
            self.notify.notify_waiters();
        }

        /// Make only `append` fail
        pub fn set_reject_appends(&self, reject: bool) {
            self.reject_appends.store(reject, Ordering::SeqCst);
        }

        /// Snapshot of a queue, head first
        pub fn items(&self, queue: QueueName) -> Vec<Vec<u8>> {
            self.queues
                .lock()
                .unwrap()
                .get(&queue)
                .map(|q| q.iter().cloned().collect())
                .unwrap_or_default()
        }

        fn check_online(&self) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(AppError::Store("connection refused (simulated)".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl OrderedStore for InMemoryStore {
        async fn append(&self, queue: QueueName, item: &[u8]) -> Result<()> {
            self.check_online()?;
            if self.reject_appends.load(Ordering::SeqCst) {
                return Err(AppError::Store("append rejected (simulated)".to_string()));
            }
            self.queues
                .lock()
                .unwrap()
                .entry(queue)
                .or_default()
                .push_back(item.to_vec());
            self.notify.notify_waiters();
            Ok(())
        }

        async fn transfer(
            &self,
            from: QueueName,
            to: QueueName,
            timeout: ClaimTimeout,
        ) -> Result<Option<Vec<u8>>> {
            let deadline = match timeout {
                ClaimTimeout::Infinite => None,
                ClaimTimeout::After(d) => Some(tokio::time::Instant::now() + d),
            };

            loop {
                // Register interest before looking so an append between the
                // check and the wait is not missed
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                self.check_online()?;
                {
                    let mut queues = self.queues.lock().unwrap();
                    if let Some(item) = queues.entry(from).or_default().pop_front() {
                        queues.entry(to).or_default().push_back(item.clone());
                        return Ok(Some(item));
                    }
                }

                match deadline {
                    None => notified.await,
                    Some(deadline) => {
                        if tokio::time::timeout_at(deadline, notified).await.is_err() {
                            return Ok(None);
                        }
                    }
                }
            }
        }

        async fn remove_first(&self, queue: QueueName, item: &[u8]) -> Result<bool> {
            self.check_online()?;
            let mut queues = self.queues.lock().unwrap();
            let q = queues.entry(queue).or_default();
            match q.iter().position(|existing| existing.as_slice() == item) {
                Some(pos) => {
                    q.remove(pos);
                    Ok(true)
                }
                None => Ok(false),
            }
        }

        async fn len(&self, queue: QueueName) -> Result<u64> {
            self.check_online()?;
            Ok(self
                .queues
                .lock()
                .unwrap()
                .get(&queue)
                .map(|q| q.len() as u64)
                .unwrap_or(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::InMemoryStore;
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_transfer_times_out_on_empty_queue() {
        let store = InMemoryStore::new();
        let item = store
            .transfer(
                QueueName::Pending,
                QueueName::Processing,
                ClaimTimeout::After(Duration::from_millis(20)),
            )
            .await
            .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_blocked_transfer_wakes_on_append() {
        let store = Arc::new(InMemoryStore::new());

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .transfer(QueueName::Pending, QueueName::Processing, ClaimTimeout::Infinite)
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.append(QueueName::Pending, b"a").await.unwrap();

        let item = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(item.as_deref(), Some(&b"a"[..]));
        assert_eq!(store.items(QueueName::Processing), vec![b"a".to_vec()]);
    }

    #[tokio::test]
    async fn test_one_append_releases_exactly_one_blocked_claimant() {
        let store = Arc::new(InMemoryStore::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .transfer(QueueName::Pending, QueueName::Processing, ClaimTimeout::Infinite)
                        .await
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.append(QueueName::Pending, b"only").await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !waiters.iter().any(|w| w.is_finished()) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (done, blocked): (Vec<_>, Vec<_>) = waiters.into_iter().partition(|w| w.is_finished());
        assert_eq!(done.len(), 1);
        assert_eq!(blocked.len(), 2);

        let item = done.into_iter().next().unwrap().await.unwrap().unwrap();
        assert_eq!(item.as_deref(), Some(&b"only"[..]));
        assert_eq!(store.items(QueueName::Processing), vec![b"only".to_vec()]);
        assert!(store.items(QueueName::Pending).is_empty());

        for waiter in blocked {
            waiter.abort();
        }
    }

    #[tokio::test]
    async fn test_remove_first_removes_oldest_copy_only() {
        let store = InMemoryStore::new();
        store.append(QueueName::Processing, b"x").await.unwrap();
        store.append(QueueName::Processing, b"y").await.unwrap();
        store.append(QueueName::Processing, b"x").await.unwrap();

        assert!(store.remove_first(QueueName::Processing, b"x").await.unwrap());
        assert_eq!(
            store.items(QueueName::Processing),
            vec![b"y".to_vec(), b"x".to_vec()]
        );
        assert!(!store.remove_first(QueueName::Processing, b"z").await.unwrap());
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        assert!(store.append(QueueName::Pending, b"a").await.is_err());
        assert!(store.len(QueueName::Pending).await.is_err());
        assert!(store
            .transfer(QueueName::Pending, QueueName::Processing, ClaimTimeout::Infinite)
            .await
            .is_err());
    }
}

// SQLite OrderedStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use taskq_core::domain::QueueName;
use taskq_core::error::Result;
use taskq_core::port::{ClaimTimeout, OrderedStore};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

/// How often a blocked claim re-checks the table for items appended by
/// other processes (100ms)
pub const CLAIM_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Queues as rows of one table, ordered by an AUTOINCREMENT id.
///
/// Clones share the pool and the wake-up signal, so a claim blocked in this
/// process reacts to an append from this process immediately and to appends
/// from other processes within `CLAIM_POLL_INTERVAL`.
#[derive(Clone)]
pub struct SqliteOrderedStore {
    pool: SqlitePool,
    appended: Arc<Notify>,
}

impl SqliteOrderedStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            appended: Arc::new(Notify::new()),
        }
    }

    /// One non-blocking transfer attempt.
    ///
    /// The head row is deleted and re-inserted under the target queue in a
    /// single transaction, so no connection ever sees the item in both
    /// queues or in neither.
    async fn try_transfer(&self, from: QueueName, to: QueueName) -> Result<Option<Vec<u8>>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let item: Option<Vec<u8>> = sqlx::query_scalar(
            r#"
            DELETE FROM queue_items
            WHERE id = (
                SELECT id FROM queue_items
                WHERE queue = ?
                ORDER BY id ASC
                LIMIT 1
            )
            RETURNING item
            "#,
        )
        .bind(from.key())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(item) = item else {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(None);
        };

        sqlx::query("INSERT INTO queue_items (queue, item, enqueued_at) VALUES (?, ?, ?)")
            .bind(to.key())
            .bind(&item)
            .bind(now_millis())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(item))
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl OrderedStore for SqliteOrderedStore {
    async fn append(&self, queue: QueueName, item: &[u8]) -> Result<()> {
        sqlx::query("INSERT INTO queue_items (queue, item, enqueued_at) VALUES (?, ?, ?)")
            .bind(queue.key())
            .bind(item)
            .bind(now_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.appended.notify_waiters();
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
            ClaimTimeout::After(d) => Some(Instant::now() + d),
        };

        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.try_transfer(from, to).await? {
                trace!(from = %from, to = %to, "Transferred item");
                return Ok(Some(item));
            }

            let wait = match deadline {
                None => CLAIM_POLL_INTERVAL,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    (deadline - now).min(CLAIM_POLL_INTERVAL)
                }
            };

            tokio::select! {
                _ = &mut notified => {},
                _ = tokio::time::sleep(wait) => {},
            }
        }
    }

    async fn remove_first(&self, queue: QueueName, item: &[u8]) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM queue_items
            WHERE id = (
                SELECT id FROM queue_items
                WHERE queue = ? AND item = ?
                ORDER BY id ASC
                LIMIT 1
            )
            "#,
        )
        .bind(queue.key())
        .bind(item)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn len(&self, queue: QueueName) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items WHERE queue = ?")
            .bind(queue.key())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(count as u64)
    }
}

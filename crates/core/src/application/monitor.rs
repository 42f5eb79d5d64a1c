// Monitor - read-only queue depth reporting

use crate::application::queue_engine::QueueEngine;
use crate::domain::QueueName;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Store health as seen by the last snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreStatus {
    Healthy,
    Degraded,
}

/// Queue depths. On store errors the counts are zero and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub dead_letter: u64,
    pub status: StoreStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueueStats {
    fn degraded(message: String) -> Self {
        Self {
            pending: 0,
            processing: 0,
            dead_letter: 0,
            status: StoreStatus::Degraded,
            error: Some(message),
        }
    }
}

/// Never mutates queue state
pub struct QueueMonitor {
    engine: QueueEngine,
}

impl QueueMonitor {
    pub fn new(engine: QueueEngine) -> Self {
        Self { engine }
    }

    /// Read all three depths. Never fails: store errors become a degraded
    /// snapshot.
    pub async fn snapshot(&self) -> QueueStats {
        match self.read_depths().await {
            Ok((pending, processing, dead_letter)) => QueueStats {
                pending,
                processing,
                dead_letter,
                status: StoreStatus::Healthy,
                error: None,
            },
            Err(e) => {
                error!(error = %e, "Failed to read queue depths");
                QueueStats::degraded(e.to_string())
            }
        }
    }

    async fn read_depths(&self) -> Result<(u64, u64, u64)> {
        let pending = self.engine.length(QueueName::Pending).await?;
        let processing = self.engine.length(QueueName::Processing).await?;
        let dead_letter = self.engine.length(QueueName::DeadLetter).await?;
        Ok((pending, processing, dead_letter))
    }
}

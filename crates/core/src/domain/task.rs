// Task Domain Model

use crate::domain::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task ID (caller-supplied or generated by the producer)
pub type TaskId = String;

/// Type assigned to tasks submitted without one
pub const DEFAULT_TASK_TYPE: &str = "default";

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

/// Unit of work moved between the pending, processing and dead-letter queues.
///
/// The serialized form is what the store holds. The store is content-agnostic,
/// so the worker identifies a claimed item by these exact bytes and never by
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    #[serde(rename = "type", default = "default_task_type")]
    pub task_type: String,

    /// Opaque to the core
    #[serde(default)]
    pub payload: String,

    /// Incremented only by the retry policy
    #[serde(default)]
    pub retry_count: u32,

    /// Set once at enqueue time
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        task_type: impl Into<String>,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            task_type: task_type.into(),
            payload: payload.into(),
            retry_count: 0,
            created_at,
        }
    }

    /// Serialize into the form stored in the queues
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Parse a raw queue item
    pub fn from_bytes(raw: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(raw).map_err(|e| DomainError::MalformedTask(e.to_string()))
    }

    /// Copy of this task for its next attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}

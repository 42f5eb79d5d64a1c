//! HTTP Request/Response Types

use serde::{Deserialize, Serialize};

pub use taskq_core::application::producer::SubmitRequest;

/// Status value returned for every accepted submission
pub const STATUS_QUEUED: &str = "queued";

/// POST /task - 202 body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: String,
    pub task_id: String,
}

impl SubmitResponse {
    pub fn queued(task_id: String) -> Self {
        Self {
            status: STATUS_QUEUED.to_string(),
            task_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// Submit Use Case

use crate::application::queue_engine::QueueEngine;
use crate::domain::{QueueName, Task, DEFAULT_TASK_TYPE};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Maximum length of a caller-supplied task ID
pub const MAX_ID_LEN: usize = 256;

/// Maximum length of a task type
pub const MAX_TYPE_LEN: usize = 128;

/// Inbound task description. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub task_type: Option<String>,

    #[serde(default)]
    pub payload: Option<String>,
}

/// Check the request before anything touches the queue
pub fn validate_request(req: &SubmitRequest) -> Result<()> {
    if let Some(id) = &req.id {
        if id.chars().count() > MAX_ID_LEN {
            return Err(AppError::Validation(format!(
                "Task id too long (max {} characters)",
                MAX_ID_LEN
            )));
        }
    }

    if let Some(task_type) = &req.task_type {
        if task_type.chars().count() > MAX_TYPE_LEN {
            return Err(AppError::Validation(format!(
                "Task type too long (max {} characters)",
                MAX_TYPE_LEN
            )));
        }
    }

    Ok(())
}

/// Execute submit use case
///
/// Blank `id` and `type` count as absent: the id is generated and the type
/// falls back to `"default"`. `created_at` is always set here.
pub async fn execute(
    engine: &QueueEngine,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: SubmitRequest,
) -> Result<String> {
    validate_request(&req)?;

    let id = req
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| id_provider.generate_id());
    let task_type = req
        .task_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TASK_TYPE.to_string());

    let task = Task::new(
        id,
        task_type,
        req.payload.unwrap_or_default(),
        time_provider.now(),
    );

    engine.enqueue_task(QueueName::Pending, &task).await?;

    info!(task_id = %task.id, task_type = %task.task_type, "Task queued");
    Ok(task.id)
}

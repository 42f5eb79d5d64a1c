//! HTTP Handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;
use taskq_core::application::{ProducerService, QueueMonitor, QueueStats};
use tracing::{error, warn};

use crate::dashboard::render_dashboard;
use crate::error::ApiError;
use crate::types::{SubmitRequest, SubmitResponse};

/// POST /task
///
/// The body is decoded by hand rather than through the `Json` extractor so
/// that every decoding failure, including a missing content type, is a 400.
pub async fn submit_task(
    State(producer): State<Arc<ProducerService>>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let req: SubmitRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Rejected malformed submission");
        ApiError::BadRequest(e.to_string())
    })?;

    let task_id = producer.submit(req).await.map_err(|e| {
        error!(error = %e, "Failed to enqueue task");
        ApiError::from(e)
    })?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::queued(task_id))))
}

/// GET /stats
pub async fn stats(State(monitor): State<Arc<QueueMonitor>>) -> Json<QueueStats> {
    Json(monitor.snapshot().await)
}

/// GET /
pub async fn dashboard(State(monitor): State<Arc<QueueMonitor>>) -> Html<String> {
    let stats = monitor.snapshot().await;
    Html(render_dashboard(&stats, Utc::now()))
}

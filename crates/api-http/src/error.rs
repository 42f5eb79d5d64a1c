//! HTTP Error Types
//!
//! Maps application errors to status codes and a `{"error": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use taskq_core::error::AppError;
use thiserror::Error;

use crate::types::ErrorResponse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error(transparent)]
    App(#[from] AppError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::App(err) => match err {
                AppError::Validation(_) | AppError::Domain(_) | AppError::Serialization(_) => {
                    StatusCode::BAD_REQUEST
                }
                AppError::Store(_)
                | AppError::Config(_)
                | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Store details stay in the server log, clients get a fixed message
    fn client_message(&self) -> String {
        match self {
            ApiError::App(AppError::Store(_)) => "Failed to enqueue task".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

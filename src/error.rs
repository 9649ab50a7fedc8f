// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::{flow::FlowError, store::StoreError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    // 500 Internal Server Error
    #[error("internal server error: {0}")]
    InternalServerError(String),

    // 400 Bad Request
    #[error("bad request: {0}")]
    BadRequest(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 409 Conflict (e.g., a submission already running)
    #[error("conflict: {0}")]
    Conflict(String),

    // 502 Bad Gateway: a remote write failed. Carries only the generic submission message.
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    // 503 Service Unavailable
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::RemoteWrite(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        let msg = err.to_string();
        match err {
            FlowError::Validation(_) | FlowError::Resource(_) | FlowError::UnknownQuestion(_) => {
                AppError::BadRequest(msg)
            }
            FlowError::SubmissionInProgress | FlowError::AlreadySubmitted => AppError::Conflict(msg),
            FlowError::RemoteWrite => AppError::RemoteWrite(msg),
            FlowError::NoQuestions => AppError::ServiceUnavailable(msg),
        }
    }
}

/// Store failures outside a submission are internal: the detail is logged, not returned.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_errors_map_to_statuses() {
        let status = |e: FlowError| AppError::from(e).into_response().status();
        assert_eq!(status(FlowError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(FlowError::Resource("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(FlowError::UnknownQuestion(4)), StatusCode::BAD_REQUEST);
        assert_eq!(status(FlowError::SubmissionInProgress), StatusCode::CONFLICT);
        assert_eq!(status(FlowError::AlreadySubmitted), StatusCode::CONFLICT);
        assert_eq!(status(FlowError::RemoteWrite), StatusCode::BAD_GATEWAY);
        assert_eq!(status(FlowError::NoQuestions), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn store_errors_are_internal() {
        let response = AppError::from(StoreError::Unavailable("db down".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

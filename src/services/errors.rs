use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::domain::models::ReportStatus;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("illegal status transition from {from} to {to}")]
    IllegalTransition {
        from: ReportStatus,
        to: ReportStatus,
    },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("conflict: report was modified by another request")]
    Conflict,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::IllegalTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::InvalidState(_) => StatusCode::CONFLICT,
            ServiceError::Conflict => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable kind, so callers can tell apart errors that
    /// share an HTTP status.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::NotFound => "not_found",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::IllegalTransition { .. } => "illegal_transition",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::Conflict => "version_conflict",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        if let ServiceError::Internal(message) = &self {
            tracing::error!(error = %message, "request failed with internal error");
        }
        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (self.status_code(), Json(body)).into_response()
    }
}

//! Error types for cprep-coach

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::plan::PlanError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Nothing left to plan for the company (404)
    #[error("No problems available: {0}")]
    NoProblems(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// cprep-common error
    #[error("Common error: {0}")]
    Common(#[from] cprep_common::Error),
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::NoProblemsAvailable { .. } => ApiError::NoProblems(err.to_string()),
            PlanError::InvalidSize => ApiError::BadRequest(err.to_string()),
        }
    }
}

/// Malformed query strings get the same JSON error body as other 400s
impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NoProblems(msg) => (StatusCode::NOT_FOUND, "NO_PROBLEMS", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Common(cprep_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => {
                tracing::error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

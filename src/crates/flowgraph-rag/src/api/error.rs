//! API error types and HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RagError;

/// Error body returned by all failing handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier.
    pub error: String,
    /// Human-readable detail.
    pub detail: String,
}

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Handler-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data, rejected before any external call.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal failure; the underlying message goes into the detail field.
    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse {
            error: self.error_type().to_string(),
            detail: self.to_string(),
        };
        tracing::error!(?body, "API error");
        (status, Json(body)).into_response()
    }
}

/// Validation failures map to 400, everything else to 500.
impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_maps_to_400() {
        let err = ApiError::BadRequest("question must not be empty".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_type(), "BadRequest");
    }

    #[test]
    fn rag_errors_split_by_kind() {
        let bad: ApiError = RagError::InvalidInput("top_k".into()).into();
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);

        let internal: ApiError =
            RagError::Persistence(std::io::Error::other("disk gone")).into();
        assert_eq!(internal.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

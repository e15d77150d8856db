//! API error types with JSON responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use notable_store::StoreError;
use serde::Serialize;

use crate::restart::RestartError;
use crate::service::ServiceError;

/// API error that can be returned from handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Store error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the error code string for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Store(e) => match e {
                StoreError::NotFound(_) => "NOT_FOUND",
                StoreError::UidConflict(_) => "UID_CONFLICT",
                StoreError::Closed => "UNAVAILABLE",
                _ => "STORAGE_ERROR",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::UidConflict(_) => StatusCode::CONFLICT,
                StoreError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidNote(reason) => Self::BadRequest(reason),
            ServiceError::Store(e) => Self::Store(e),
        }
    }
}

impl From<RestartError> for ApiError {
    fn from(err: RestartError) -> Self {
        match err {
            RestartError::AlreadyPending => Self::Conflict(err.to_string()),
            RestartError::Closed => Self::Internal(err.to_string()),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetails,
}

/// Error details within the response.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// Error code (e.g., "NOT_FOUND", "BAD_REQUEST").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Store(StoreError::Closed) => {
                tracing::error!("request reached a closed backend");
            }
            Self::Store(e) if e.is_fatal() => tracing::error!(error = %e, "storage failure"),
            Self::Store(StoreError::NotFound(_) | StoreError::UidConflict(_))
            | Self::BadRequest(_)
            | Self::Conflict(_) => {}
            _ => tracing::warn!(error = %self, "request failed"),
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use notable_core::NoteId;

    #[test]
    fn test_status_mapping() {
        let uid = NoteId::new();
        let cases = [
            (ApiError::from(StoreError::NotFound(uid)), StatusCode::NOT_FOUND),
            (ApiError::from(StoreError::UidConflict(uid)), StatusCode::CONFLICT),
            (ApiError::from(StoreError::Closed), StatusCode::SERVICE_UNAVAILABLE),
            (
                ApiError::from(StoreError::StorageWrite("disk full".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(StoreError::Corrupt("bad json".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(ServiceError::InvalidNote("empty".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::from(RestartError::AlreadyPending), StatusCode::CONFLICT),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::from(StoreError::NotFound(NoteId::new())).code(), "NOT_FOUND");
        assert_eq!(ApiError::BadRequest("x".into()).code(), "BAD_REQUEST");
    }
}

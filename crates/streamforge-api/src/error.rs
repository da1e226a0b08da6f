//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::error;

use streamforge_storage::StorageError;
use streamforge_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

static HIDE_DETAILS: AtomicBool = AtomicBool::new(false);

/// Replace server-error details with generic messages in responses.
pub fn hide_error_details(hide: bool) {
    HIDE_DETAILS.store(hide, Ordering::Relaxed);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,

    #[error("{0}")]
    InvalidFile(String),

    #[error("File exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("Failed to upload video: {0}")]
    UploadFailed(String),

    #[error("Video not found")]
    VideoNotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn invalid_file(msg: impl Into<String>) -> Self {
        Self::InvalidFile(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFile | ApiError::InvalidFile(_) => StatusCode::BAD_REQUEST,
            ApiError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::VideoNotFound => StatusCode::NOT_FOUND,
            ApiError::UploadFailed(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NoFile => "upload/no-file",
            ApiError::InvalidFile(_) => "upload/invalid-file",
            ApiError::TooLarge(_) => "upload/too-large",
            ApiError::UploadFailed(_) => "upload/server-error",
            ApiError::VideoNotFound => "video/not-found",
            ApiError::Internal(_) => "video/server-error",
        }
    }

    fn public_message(&self, hide_details: bool) -> String {
        match self {
            ApiError::UploadFailed(_) if hide_details => "Failed to upload video".to_string(),
            ApiError::Internal(_) if hide_details => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::JobNotFound(_) => ApiError::VideoNotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::UploadFailed(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        }

        let body = ErrorResponse {
            message: self.public_message(HIDE_DETAILS.load(Ordering::Relaxed)),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_statuses() {
        assert_eq!(ApiError::NoFile.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::TooLarge(10).code(), "upload/too-large");
        assert_eq!(ApiError::TooLarge(10).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::VideoNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_worker_not_found_maps_to_404() {
        let err: ApiError = WorkerError::JobNotFound("abc".to_string()).into();
        assert!(matches!(err, ApiError::VideoNotFound));
        assert_eq!(err.code(), "video/not-found");
    }

    #[test]
    fn test_server_error_details_hidden_when_asked() {
        let err: ApiError = StorageError::upload_failed("uploads/abc/original.mp4", "bucket unreachable").into();
        assert!(err.public_message(false).contains("bucket unreachable"));
        assert_eq!(err.public_message(true), "Failed to upload video");

        let err: ApiError = WorkerError::config_error("bad ladder").into();
        assert_eq!(err.public_message(true), "An internal error occurred");
        assert_eq!(ApiError::VideoNotFound.public_message(true), "Video not found");
    }
}

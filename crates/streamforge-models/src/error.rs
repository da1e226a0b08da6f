//! Model-level error types.

use thiserror::Error;

use crate::job::JobStatus;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating or transitioning model values.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Invalid rendition ladder: {0}")]
    InvalidLadder(String),

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_ladder(msg: impl Into<String>) -> Self {
        Self::InvalidLadder(msg.into())
    }
}

//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use streamforge_media::MediaError;
use streamforge_models::ModelError;
use streamforge_storage::StorageError;

use crate::registry::RegistryError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Source file missing or unreadable: {0}")]
    SourceMissing(PathBuf),

    #[error("Probe failed: {0}")]
    Probe(#[source] MediaError),

    #[error("Thumbnail failed: {0}")]
    Thumbnail(#[source] MediaError),

    #[error("Transcode of {rendition} failed: {source}")]
    Transcode {
        rendition: String,
        #[source]
        source: MediaError,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid job state: {0}")]
    Model(#[from] ModelError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn transcode(rendition: impl Into<String>, source: MediaError) -> Self {
        Self::Transcode {
            rendition: rendition.into(),
            source,
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short label for metrics and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::SourceMissing(_) => "source",
            WorkerError::Probe(_) => "probe",
            WorkerError::Thumbnail(_) => "thumbnail",
            WorkerError::Transcode { .. } => "transcode",
            WorkerError::Storage(_) => "storage",
            WorkerError::Registry(_) => "registry",
            WorkerError::Model(_) => "state",
            WorkerError::JobNotFound(_) => "lookup",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_message_carries_cause() {
        let err = WorkerError::transcode(
            "480p",
            MediaError::ffmpeg_failed("decode failed", None, Some(1)),
        );
        let message = err.to_string();
        assert!(message.contains("480p"));
        assert!(message.contains("decode failed"));
        assert_eq!(err.stage(), "transcode");
    }
}

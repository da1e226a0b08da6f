//! Job records and their status state machine.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ModelError, ModelResult};
use crate::video::PublishedVideo;

/// Number of random bytes in a generated job ID.
const JOB_ID_BYTES: usize = 12;

/// Default title for uploads that did not supply one.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (24 lowercase hex characters).
    pub fn new() -> Self {
        let mut bytes = [0u8; JOB_ID_BYTES];
        rand::rng().fill(&mut bytes);
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Uploaded and waiting for the worker
    #[default]
    Pending,
    /// Held by the worker loop
    Processing,
    /// Published successfully
    Ready,
    /// Processing failed
    Error,
}

impl JobStatus {
    /// All statuses in listing order.
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Ready,
        JobStatus::Processing,
        JobStatus::Pending,
        JobStatus::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Ready => "ready",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Error)
    }

    /// Whether `self -> next` follows `pending -> processing -> {ready | error}`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Ready)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A job as held in the registry.
///
/// Records are immutable values: every transition returns a new record that
/// replaces the old one wholesale, so readers never see a mix of versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Current status
    pub status: JobStatus,

    /// User-supplied title
    pub title: String,

    /// User-supplied description
    #[serde(default)]
    pub description: String,

    /// Storage key of the uploaded original
    pub source_key: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Published output, present exactly when `status == Ready`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishedVideo>,

    /// Failure reason, present exactly when `status == Error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl JobRecord {
    /// Create a new pending record.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        source_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        let title = title.into();
        Self {
            status: JobStatus::Pending,
            title: if title.trim().is_empty() {
                DEFAULT_TITLE.to_string()
            } else {
                title
            },
            description: description.into(),
            source_key: source_key.into(),
            created_at: now,
            updated_at: now,
            published: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Master manifest URL, set only for ready jobs.
    pub fn result_url(&self) -> Option<&str> {
        self.published.as_ref().map(|p| p.result_url.as_str())
    }

    /// Thumbnail URL, set only for ready jobs.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.published.as_ref().map(|p| p.thumbnail_url.as_str())
    }

    /// `pending -> processing`.
    pub fn start_processing(&self) -> ModelResult<Self> {
        self.transition(JobStatus::Processing, None, None)
    }

    /// `processing -> ready`, setting both URLs and the metadata together.
    pub fn complete(&self, published: PublishedVideo) -> ModelResult<Self> {
        self.transition(JobStatus::Ready, Some(published), None)
    }

    /// `processing -> error`.
    pub fn fail(&self, message: impl Into<String>) -> ModelResult<Self> {
        self.transition(JobStatus::Error, None, Some(message.into()))
    }

    fn transition(
        &self,
        next: JobStatus,
        published: Option<PublishedVideo>,
        error_message: Option<String>,
    ) -> ModelResult<Self> {
        if !self.status.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        Ok(Self {
            status: next,
            updated_at: Utc::now(),
            published,
            error_message,
            ..self.clone()
        })
    }
}

//! Shared data models for the Streamforge video pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Job records and the status state machine
//! - Source metadata and published output
//! - The rendition ladder and encoding settings
//! - Object storage key layout

pub mod encoding;
pub mod error;
pub mod job;
pub mod keys;
pub mod rendition;
pub mod video;

// Re-export common types
pub use encoding::{CachePolicy, EncodingSettings, FrameSize};
pub use error::{ModelError, ModelResult};
pub use job::{JobId, JobRecord, JobStatus, DEFAULT_TITLE};
pub use rendition::{default_ladder, parse_ladder, validate_ladder, H264Profile, RenditionSpec};
pub use video::{PublishedVideo, VideoMetadata};

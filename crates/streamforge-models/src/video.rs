//! Source metadata and published output.

use serde::{Deserialize, Serialize};

/// Metadata probed from the uploaded source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Everything a ready job exposes to clients.
///
/// Both URLs and the metadata travel together so they are written in the same
/// record replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedVideo {
    /// Public URL of the master manifest
    pub result_url: String,
    /// Public URL of the thumbnail
    pub thumbnail_url: String,
    /// Source metadata
    #[serde(flatten)]
    pub metadata: VideoMetadata,
}

//! Encoding and publishing settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Default audio channel count
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;
/// Default HLS segment length in seconds
pub const DEFAULT_SEGMENT_SECONDS: u32 = 6;
/// Default thumbnail capture offset in seconds
pub const DEFAULT_THUMBNAIL_OFFSET_SECS: f64 = 1.0;
/// Default thumbnail frame size
pub const DEFAULT_THUMBNAIL_SIZE: FrameSize = FrameSize::new(1280, 720);

/// Cache-control for playlists, which may be re-published
pub const DEFAULT_CACHE_CONTROL_PLAYLIST: &str = "public, max-age=60";
/// Cache-control for content-addressed objects (segments, thumbnails, originals)
pub const DEFAULT_CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// A `WIDTHxHEIGHT` frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidFrameSize(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Settings shared by every rendition and thumbnail of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingSettings {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    #[serde(default = "default_audio_channels")]
    pub audio_channels: u8,

    /// HLS target segment duration
    #[serde(default = "default_segment_seconds")]
    pub segment_seconds: u32,

    /// Where in the source the thumbnail is grabbed
    #[serde(default = "default_thumbnail_offset")]
    pub thumbnail_offset_secs: f64,

    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: FrameSize,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_audio_channels() -> u8 {
    DEFAULT_AUDIO_CHANNELS
}
fn default_segment_seconds() -> u32 {
    DEFAULT_SEGMENT_SECONDS
}
fn default_thumbnail_offset() -> f64 {
    DEFAULT_THUMBNAIL_OFFSET_SECS
}
fn default_thumbnail_size() -> FrameSize {
    DEFAULT_THUMBNAIL_SIZE
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_channels: DEFAULT_AUDIO_CHANNELS,
            segment_seconds: DEFAULT_SEGMENT_SECONDS,
            thumbnail_offset_secs: DEFAULT_THUMBNAIL_OFFSET_SECS,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

/// Cache-control headers applied to published objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub playlist: String,
    pub immutable: String,
}

impl CachePolicy {
    /// Pick the header for an object key: playlists get the short policy.
    pub fn for_key(&self, key: &str) -> &str {
        if key.ends_with(".m3u8") {
            &self.playlist
        } else {
            &self.immutable
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            playlist: DEFAULT_CACHE_CONTROL_PLAYLIST.to_string(),
            immutable: DEFAULT_CACHE_CONTROL_IMMUTABLE.to_string(),
        }
    }
}

//! FFmpeg CLI adapter for HLS packaging.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cancellation and timeout support via tokio
//! - Probe, thumbnail and HLS rendition operations behind the [`Encoder`] trait

pub mod command;
pub mod encoder;
pub mod error;
pub mod hls;
pub mod probe;
pub mod progress;
pub mod thumbnail;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encoder::{Encoder, FfmpegEncoder, DEFAULT_ENCODER_TIMEOUT_SECS};
pub use error::{MediaError, MediaResult};
pub use hls::{rendition_command, transcode_rendition};
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use thumbnail::generate_thumbnail;

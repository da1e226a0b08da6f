//! The encoder seam used by the packaging pipeline.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

use crate::command::{check_ffmpeg, check_ffprobe, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::{hls, probe, thumbnail};
use streamforge_models::{EncodingSettings, FrameSize, RenditionSpec, VideoMetadata};

/// Default per-invocation timeout in seconds.
pub const DEFAULT_ENCODER_TIMEOUT_SECS: u64 = 3600;

/// Media operations needed to package one job.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Read duration and frame size from a source file.
    async fn probe(&self, path: &Path) -> MediaResult<VideoMetadata>;

    /// Capture one frame at `at_seconds`, scaled to `size`, into `output`.
    async fn thumbnail(
        &self,
        path: &Path,
        at_seconds: f64,
        size: FrameSize,
        output: &Path,
    ) -> MediaResult<PathBuf>;

    /// Encode one rendition into `output_dir`.
    ///
    /// Must return [`MediaError::Cancelled`] promptly once `cancel` reads `true`.
    async fn transcode(
        &self,
        path: &Path,
        rendition: &RenditionSpec,
        settings: &EncodingSettings,
        output_dir: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<PathBuf>;
}

/// [`Encoder`] backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    timeout_secs: u64,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_ENCODER_TIMEOUT_SECS)
    }
}

impl FfmpegEncoder {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }

    /// Fail fast at startup when the tools are not installed.
    pub fn check_available() -> MediaResult<()> {
        check_ffmpeg()?;
        check_ffprobe()?;
        Ok(())
    }

    fn runner(&self) -> FfmpegRunner {
        FfmpegRunner::new().with_timeout(self.timeout_secs)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn probe(&self, path: &Path) -> MediaResult<VideoMetadata> {
        let info = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            probe::probe_video(path),
        )
        .await
        .map_err(|_| MediaError::Timeout(self.timeout_secs))??;

        Ok(info.metadata())
    }

    async fn thumbnail(
        &self,
        path: &Path,
        at_seconds: f64,
        size: FrameSize,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        thumbnail::generate_thumbnail(path, output, at_seconds, size, &self.runner()).await?;
        Ok(output.to_path_buf())
    }

    async fn transcode(
        &self,
        path: &Path,
        rendition: &RenditionSpec,
        settings: &EncodingSettings,
        output_dir: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<PathBuf> {
        let runner = self.runner().with_cancel(cancel);
        hls::transcode_rendition(path, rendition, settings, output_dir, &runner).await
    }
}

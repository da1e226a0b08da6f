//! Thumbnail generation.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use streamforge_models::FrameSize;

/// Build the single-frame capture command.
pub fn thumbnail_command(
    video_path: &Path,
    output_path: &Path,
    at_seconds: f64,
    size: FrameSize,
) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .seek(at_seconds.max(0.0))
        .single_frame()
        .video_filter(format!("scale={}:{}", size.width, size.height))
        .output_opt("-q:v", "2")
        .log_level("error")
}

/// Generate a thumbnail from a video file.
pub async fn generate_thumbnail(
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    at_seconds: f64,
    size: FrameSize,
    runner: &FfmpegRunner,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }

    let cmd = thumbnail_command(video_path, output_path, at_seconds, size);
    runner.run(&cmd).await?;

    // Seeking past the end exits cleanly without writing a frame
    if !output_path.exists() {
        return Err(MediaError::ffmpeg_failed(
            format!("no frame captured at {:.3}s", at_seconds),
            None,
            None,
        ));
    }

    Ok(())
}

//! HLS rendition encoding.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use streamforge_models::keys::{PLAYLIST_FILE, SEGMENT_PATTERN};
use streamforge_models::{EncodingSettings, RenditionSpec};

/// Build the FFmpeg invocation that writes one VOD rendition into `output_dir`.
pub fn rendition_command(
    input: &Path,
    rendition: &RenditionSpec,
    settings: &EncodingSettings,
    output_dir: &Path,
) -> FfmpegCommand {
    let segment_pattern = output_dir.join(SEGMENT_PATTERN);

    FfmpegCommand::new(input, output_dir.join(PLAYLIST_FILE))
        .video_filter(format!("scale={}:{}", rendition.width, rendition.height))
        .video_codec(&settings.video_codec)
        .output_opt("-b:v", format!("{}k", rendition.video_bitrate_kbps))
        .output_opt("-maxrate", format!("{}k", rendition.max_bitrate_kbps))
        .output_opt("-bufsize", format!("{}k", rendition.buffer_size_kbps))
        .output_opt("-profile:v", rendition.profile.as_str())
        .audio_codec(&settings.audio_codec)
        .audio_bitrate(&settings.audio_bitrate)
        .output_opt("-ac", settings.audio_channels.to_string())
        .output_opt("-f", "hls")
        .output_opt("-hls_time", settings.segment_seconds.to_string())
        .output_opt("-hls_list_size", "0")
        .output_opt("-hls_segment_filename", segment_pattern.to_string_lossy())
        .output_opt("-hls_playlist_type", "vod")
}

/// Encode one rendition. Returns the directory holding its playlist and segments.
pub async fn transcode_rendition(
    input: &Path,
    rendition: &RenditionSpec,
    settings: &EncodingSettings,
    output_dir: &Path,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    tokio::fs::create_dir_all(output_dir).await?;

    let name = rendition.name();
    let cmd = rendition_command(input, rendition, settings, output_dir);

    runner
        .run_with_progress(&cmd, move |progress| {
            debug!(
                rendition = %name,
                out_time_secs = progress.out_time_secs(),
                speed = progress.speed,
                "Encoding progress"
            );
        })
        .await?;

    let playlist = output_dir.join(PLAYLIST_FILE);
    if !playlist.exists() {
        return Err(MediaError::ffmpeg_failed(
            format!("{} produced no playlist", rendition.name()),
            None,
            None,
        ));
    }

    Ok(output_dir.to_path_buf())
}

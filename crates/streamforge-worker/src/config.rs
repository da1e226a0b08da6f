//! Worker configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use streamforge_media::DEFAULT_ENCODER_TIMEOUT_SECS;
use streamforge_models::{
    default_ladder, parse_ladder, validate_ladder, CachePolicy, EncodingSettings, FrameSize,
    RenditionSpec,
};

use crate::error::{WorkerError, WorkerResult};

/// Default scheduler period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Scheduler firing period
    pub poll_interval: Duration,
    /// Scratch root, one subdirectory per job
    pub work_dir: PathBuf,
    /// Upper bound on any single encoder invocation
    pub encoder_timeout_secs: u64,
    /// Renditions to produce, highest quality first
    pub ladder: Vec<RenditionSpec>,
    /// Codec, audio, segment and thumbnail settings
    pub encoding: EncodingSettings,
    /// Cache-control headers for published objects
    pub cache_policy: CachePolicy,
    /// Remove the uploaded original once the job is ready
    pub delete_source_after_processing: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            work_dir: std::env::temp_dir().join("streamforge"),
            encoder_timeout_secs: DEFAULT_ENCODER_TIMEOUT_SECS,
            ladder: default_ladder(),
            encoding: EncodingSettings::default(),
            cache_policy: CachePolicy::default(),
            delete_source_after_processing: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();

        let ladder = match std::env::var("RENDITION_LADDER_FILE") {
            Ok(path) if !path.trim().is_empty() => load_ladder(&path)?,
            _ => defaults.ladder,
        };

        let encoding = EncodingSettings {
            segment_seconds: env_parse("HLS_SEGMENT_SECONDS")?
                .unwrap_or(defaults.encoding.segment_seconds),
            thumbnail_offset_secs: env_parse("THUMBNAIL_OFFSET_SECS")?
                .unwrap_or(defaults.encoding.thumbnail_offset_secs),
            thumbnail_size: env_parse::<FrameSize>("THUMBNAIL_SIZE")?
                .unwrap_or(defaults.encoding.thumbnail_size),
            ..defaults.encoding
        };

        let cache_policy = CachePolicy {
            playlist: std::env::var("CACHE_CONTROL_PLAYLIST")
                .unwrap_or(defaults.cache_policy.playlist),
            immutable: std::env::var("CACHE_CONTROL_IMMUTABLE")
                .unwrap_or(defaults.cache_policy.immutable),
        };

        let config = Self {
            poll_interval: env_parse::<u64>("WORKER_POLL_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            encoder_timeout_secs: env_parse("ENCODER_TIMEOUT_SECS")?
                .unwrap_or(defaults.encoder_timeout_secs),
            ladder,
            encoding,
            cache_policy,
            delete_source_after_processing: env_parse("DELETE_SOURCE_AFTER_PROCESSING")?
                .unwrap_or(defaults.delete_source_after_processing),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.poll_interval.is_zero() {
            return Err(WorkerError::config_error("poll interval must be positive"));
        }
        if self.encoding.segment_seconds == 0 {
            return Err(WorkerError::config_error("HLS segment length must be positive"));
        }
        if self.encoder_timeout_secs == 0 {
            return Err(WorkerError::config_error("encoder timeout must be positive"));
        }
        validate_ladder(&self.ladder)?;
        Ok(())
    }
}

fn load_ladder(path: &str) -> WorkerResult<Vec<RenditionSpec>> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        WorkerError::config_error(format!("cannot read RENDITION_LADDER_FILE {}: {}", path, e))
    })?;
    Ok(parse_ladder(&json)?)
}

/// Parse an optional variable; present-but-malformed is an error.
fn env_parse<T: FromStr>(name: &str) -> WorkerResult<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::config_error(format!("invalid {}: '{}'", name, value))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = WorkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.ladder.len(), 5);
        assert!(config.delete_source_after_processing);
    }

    #[test]
    fn test_validate_rejects_empty_ladder() {
        let config = WorkerConfig {
            ladder: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::Model(_))));
    }

    #[test]
    fn test_load_ladder_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"width": 640, "height": 360, "video_bitrate_kbps": 800,
                "max_bitrate_kbps": 800, "buffer_size_kbps": 1600, "profile": "baseline"}}]"#
        )
        .unwrap();

        let ladder = load_ladder(file.path().to_str().unwrap()).unwrap();
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].name(), "360p");
    }

    #[test]
    fn test_load_ladder_missing_file() {
        assert!(matches!(
            load_ladder("/nonexistent/streamforge/ladder.json"),
            Err(WorkerError::ConfigError(_))
        ));
    }
}

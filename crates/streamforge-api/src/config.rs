//! API configuration.

use std::str::FromStr;

/// MIME types accepted for upload when nothing else is configured.
pub const DEFAULT_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
    "video/x-ms-wmv",
    "video/x-flv",
    "video/3gpp",
    "video/x-m4v",
    "video/mpeg",
];

/// Default upload limit: 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 100 * 1024 * 1024;

/// Which upload MIME types are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedVideoTypes {
    /// Any `video/*` type
    AnyVideo,
    /// Exactly these types
    List(Vec<String>),
}

impl Default for AllowedVideoTypes {
    fn default() -> Self {
        Self::List(DEFAULT_VIDEO_TYPES.iter().map(|s| s.to_string()).collect())
    }
}

impl AllowedVideoTypes {
    pub fn permits(&self, mime: &str) -> bool {
        let mime = mime.trim().to_ascii_lowercase();
        match self {
            Self::AnyVideo => mime.starts_with("video/"),
            Self::List(types) => types.iter().any(|t| *t == mime),
        }
    }
}

impl FromStr for AllowedVideoTypes {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::AnyVideo);
        }
        let types: Vec<String> = s
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if types.is_empty() {
            Ok(Self::default())
        } else {
            Ok(Self::List(types))
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Largest accepted upload, in bytes
    pub max_file_size: usize,
    /// Accepted upload MIME types
    pub allowed_video_types: AllowedVideoTypes,
    /// Environment (development/production)
    pub environment: String,
    /// Serve Prometheus metrics at /metrics
    pub metrics_enabled: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: vec!["*".to_string()],
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_video_types: AllowedVideoTypes::default(),
            environment: "development".to_string(),
            metrics_enabled: true,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_file_size: std::env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_file_size),
            allowed_video_types: std::env::var("ALLOWED_VIDEO_TYPES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.allowed_video_types),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}

/// File extension for the stored original.
///
/// Falls back to the client's file name, then to `mp4`.
pub fn extension_for_mime(mime: &str, file_name: Option<&str>) -> String {
    let known = match mime.trim().to_ascii_lowercase().as_str() {
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "video/x-msvideo" => Some("avi"),
        "video/x-matroska" => Some("mkv"),
        "video/webm" => Some("webm"),
        "video/x-ms-wmv" => Some("wmv"),
        "video/x-flv" => Some("flv"),
        "video/3gpp" => Some("3gp"),
        "video/x-m4v" => Some("m4v"),
        "video/mpeg" => Some("mpg"),
        _ => None,
    };
    if let Some(ext) = known {
        return ext.to_string();
    }

    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "mp4".to_string())
}

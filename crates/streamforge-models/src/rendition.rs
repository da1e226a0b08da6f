//! Rendition ladder definitions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{ModelError, ModelResult};

/// H.264 profile tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum H264Profile {
    Baseline,
    Main,
    High,
}

impl H264Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            H264Profile::Baseline => "baseline",
            H264Profile::Main => "main",
            H264Profile::High => "high",
        }
    }
}

impl fmt::Display for H264Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One encoded variant of the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub width: u32,
    pub height: u32,
    /// Target video bitrate in kbit/s
    pub video_bitrate_kbps: u32,
    /// Peak video bitrate in kbit/s
    pub max_bitrate_kbps: u32,
    /// Rate-control buffer size in kbit
    pub buffer_size_kbps: u32,
    pub profile: H264Profile,
}

impl RenditionSpec {
    pub const fn new(
        width: u32,
        height: u32,
        video_bitrate_kbps: u32,
        max_bitrate_kbps: u32,
        buffer_size_kbps: u32,
        profile: H264Profile,
    ) -> Self {
        Self {
            width,
            height,
            video_bitrate_kbps,
            max_bitrate_kbps,
            buffer_size_kbps,
            profile,
        }
    }

    /// Rendition name, e.g. `720p`. Also used as its directory name.
    pub fn name(&self) -> String {
        format!("{}p", self.height)
    }

    /// `WxH` resolution string.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Advertised bandwidth in bits per second.
    pub fn bandwidth_bps(&self) -> u64 {
        u64::from(self.video_bitrate_kbps) * 1000
    }

    /// Path of the rendition playlist relative to the master manifest.
    pub fn playlist_uri(&self) -> String {
        format!("{}/{}", self.name(), crate::keys::PLAYLIST_FILE)
    }
}

/// The built-in ladder, highest quality first.
pub fn default_ladder() -> Vec<RenditionSpec> {
    vec![
        RenditionSpec::new(1920, 1080, 6000, 6000, 12000, H264Profile::High),
        RenditionSpec::new(1280, 720, 2800, 2800, 5600, H264Profile::Main),
        RenditionSpec::new(854, 480, 1400, 1400, 2800, H264Profile::Main),
        RenditionSpec::new(640, 360, 800, 800, 1600, H264Profile::Baseline),
        RenditionSpec::new(426, 240, 400, 400, 800, H264Profile::Baseline),
    ]
}

/// Parse a ladder from a JSON array and validate it.
pub fn parse_ladder(json: &str) -> ModelResult<Vec<RenditionSpec>> {
    let ladder: Vec<RenditionSpec> = serde_json::from_str(json)?;
    validate_ladder(&ladder)?;
    Ok(ladder)
}

/// A ladder must be non-empty with unique names and non-zero dimensions.
pub fn validate_ladder(ladder: &[RenditionSpec]) -> ModelResult<()> {
    if ladder.is_empty() {
        return Err(ModelError::invalid_ladder("ladder is empty"));
    }

    let mut seen = HashSet::new();
    for rendition in ladder {
        if rendition.width == 0 || rendition.height == 0 {
            return Err(ModelError::invalid_ladder(format!(
                "{} has a zero dimension",
                rendition.resolution()
            )));
        }
        if rendition.video_bitrate_kbps == 0 {
            return Err(ModelError::invalid_ladder(format!(
                "{} has a zero bitrate",
                rendition.name()
            )));
        }
        if !seen.insert(rendition.name()) {
            return Err(ModelError::invalid_ladder(format!(
                "duplicate rendition {}",
                rendition.name()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder_order() {
        let names: Vec<String> = default_ladder().iter().map(|r| r.name()).collect();
        assert_eq!(names, ["1080p", "720p", "480p", "360p", "240p"]);
        assert!(validate_ladder(&default_ladder()).is_ok());
    }

    #[test]
    fn test_rendition_helpers() {
        let r = &default_ladder()[2];
        assert_eq!(r.resolution(), "854x480");
        assert_eq!(r.bandwidth_bps(), 1_400_000);
        assert_eq!(r.playlist_uri(), "480p/playlist.m3u8");
        assert_eq!(r.profile.as_str(), "main");
    }

    #[test]
    fn test_parse_ladder() {
        let json = r#"[
            {"width": 1280, "height": 720, "video_bitrate_kbps": 3000,
             "max_bitrate_kbps": 3200, "buffer_size_kbps": 6000, "profile": "main"}
        ]"#;
        let ladder = parse_ladder(json).unwrap();
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder[0].profile, H264Profile::Main);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(matches!(parse_ladder("[]"), Err(ModelError::InvalidLadder(_))));

        let mut ladder = default_ladder();
        ladder.push(ladder[1].clone());
        assert!(matches!(
            validate_ladder(&ladder),
            Err(ModelError::InvalidLadder(msg)) if msg.contains("720p")
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(parse_ladder("{"), Err(ModelError::Json(_))));
    }
}

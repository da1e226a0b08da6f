//! HLS master playlist.

use streamforge_models::RenditionSpec;

const HEADER: &str = "#EXTM3U\n#EXT-X-VERSION:3\n\n";
const STREAM_INF: &str = "#EXT-X-STREAM-INF:";

/// One variant line pair read back from a master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantEntry {
    pub bandwidth: u64,
    pub resolution: Option<String>,
    pub uri: String,
}

/// Render the master playlist, listing renditions in the given order.
pub fn build_master_playlist(renditions: &[RenditionSpec]) -> String {
    let mut playlist = String::from(HEADER);

    for rendition in renditions {
        playlist.push_str(&format!(
            "{}BANDWIDTH={},RESOLUTION={}\n{}\n",
            STREAM_INF,
            rendition.bandwidth_bps(),
            rendition.resolution(),
            rendition.playlist_uri()
        ));
    }

    playlist
}

/// Read the variants of a master playlist in listing order.
///
/// Tags other than `EXT-X-STREAM-INF` are skipped. A stream tag without a
/// following URI is dropped.
pub fn parse_master_playlist(text: &str) -> Vec<VariantEntry> {
    let mut variants = Vec::new();
    let mut pending: Option<(u64, Option<String>)> = None;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(attributes) = line.strip_prefix(STREAM_INF) {
            let mut bandwidth = 0;
            let mut resolution = None;
            for attribute in attributes.split(',') {
                match attribute.split_once('=') {
                    Some(("BANDWIDTH", value)) => bandwidth = value.parse().unwrap_or(0),
                    Some(("RESOLUTION", value)) => resolution = Some(value.to_string()),
                    _ => {}
                }
            }
            pending = Some((bandwidth, resolution));
        } else if line.starts_with('#') {
            continue;
        } else if let Some((bandwidth, resolution)) = pending.take() {
            variants.push(VariantEntry {
                bandwidth,
                resolution,
                uri: line.to_string(),
            });
        }
    }

    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamforge_models::{default_ladder, H264Profile};

    #[test]
    fn test_exact_output() {
        let ladder = vec![
            RenditionSpec::new(1920, 1080, 6000, 6000, 12000, H264Profile::High),
            RenditionSpec::new(1280, 720, 2800, 2800, 5600, H264Profile::Main),
        ];
        assert_eq!(
            build_master_playlist(&ladder),
            "#EXTM3U\n#EXT-X-VERSION:3\n\n\
             #EXT-X-STREAM-INF:BANDWIDTH=6000000,RESOLUTION=1920x1080\n1080p/playlist.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2800000,RESOLUTION=1280x720\n720p/playlist.m3u8\n"
        );
    }

    #[test]
    fn test_order_follows_input() {
        let mut ladder = default_ladder();
        ladder.reverse();

        let uris: Vec<String> = parse_master_playlist(&build_master_playlist(&ladder))
            .into_iter()
            .map(|v| v.uri)
            .collect();
        assert_eq!(
            uris,
            [
                "240p/playlist.m3u8",
                "360p/playlist.m3u8",
                "480p/playlist.m3u8",
                "720p/playlist.m3u8",
                "1080p/playlist.m3u8"
            ]
        );
    }

    #[test]
    fn test_deterministic() {
        let ladder = default_ladder();
        assert_eq!(build_master_playlist(&ladder), build_master_playlist(&ladder));
    }

    #[test]
    fn test_parse_reads_attributes() {
        let variants = parse_master_playlist(&build_master_playlist(&default_ladder()[2..3]));
        assert_eq!(
            variants,
            [VariantEntry {
                bandwidth: 1_400_000,
                resolution: Some("854x480".into()),
                uri: "480p/playlist.m3u8".into(),
            }]
        );
    }

    #[test]
    fn test_parse_ignores_dangling_tag() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n";
        assert!(parse_master_playlist(text).is_empty());
    }
}

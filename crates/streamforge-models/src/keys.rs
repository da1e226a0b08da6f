//! Object storage key layout.
//!
//! ```text
//! uploads/<id>/original.<ext>
//! thumbnails/<id>.jpg
//! videos/<id>/master.m3u8
//! videos/<id>/<rendition>/playlist.m3u8
//! videos/<id>/<rendition>/segment<N>.ts
//! ```

use crate::job::JobId;
use crate::rendition::RenditionSpec;

pub const MASTER_PLAYLIST_FILE: &str = "master.m3u8";
pub const PLAYLIST_FILE: &str = "playlist.m3u8";
pub const SEGMENT_PATTERN: &str = "segment%d.ts";

pub fn source_key(id: &JobId, extension: &str) -> String {
    format!("uploads/{}/original.{}", id, extension.trim_start_matches('.'))
}

pub fn thumbnail_key(id: &JobId) -> String {
    format!("thumbnails/{}.jpg", id)
}

pub fn video_prefix(id: &JobId) -> String {
    format!("videos/{}", id)
}

pub fn master_key(id: &JobId) -> String {
    format!("{}/{}", video_prefix(id), MASTER_PLAYLIST_FILE)
}

pub fn rendition_prefix(id: &JobId, rendition: &RenditionSpec) -> String {
    format!("{}/{}", video_prefix(id), rendition.name())
}

pub fn rendition_playlist_key(id: &JobId, rendition: &RenditionSpec) -> String {
    format!("{}/{}", rendition_prefix(id, rendition), PLAYLIST_FILE)
}

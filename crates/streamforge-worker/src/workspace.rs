//! Per-job scratch directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use streamforge_models::{JobId, RenditionSpec};

const HLS_DIR: &str = "hls";
const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// `<scratch>/<id>/` for one job's processing pass.
///
/// Owned by that pass alone. [`JobWorkspace::cleanup`] removes the tree; if a
/// pass unwinds without calling it, `Drop` removes it synchronously.
#[derive(Debug)]
pub struct JobWorkspace {
    root: PathBuf,
    removed: bool,
}

impl JobWorkspace {
    /// Create a fresh directory, clearing any leftover from an earlier pass.
    pub async fn create(scratch_root: &Path, id: &JobId) -> std::io::Result<Self> {
        let root = scratch_root.join(id.as_str());
        if tokio::fs::try_exists(&root).await.unwrap_or(false) {
            debug!(path = %root.display(), "Removing stale workspace");
            tokio::fs::remove_dir_all(&root).await?;
        }
        tokio::fs::create_dir_all(root.join(HLS_DIR)).await?;

        Ok(Self {
            root,
            removed: false,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the staged source is written; keeps the original extension.
    pub fn source_path(&self, extension: &str) -> PathBuf {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            self.root.join("source")
        } else {
            self.root.join(format!("source.{}", extension))
        }
    }

    pub fn thumbnail_path(&self) -> PathBuf {
        self.root.join(THUMBNAIL_FILE)
    }

    /// Directory holding the master playlist.
    pub fn hls_dir(&self) -> PathBuf {
        self.root.join(HLS_DIR)
    }

    pub fn rendition_dir(&self, rendition: &RenditionSpec) -> PathBuf {
        self.hls_dir().join(rendition.name())
    }

    /// Remove the tree. Failures are logged, never returned.
    pub async fn cleanup(mut self) {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => debug!(path = %self.root.display(), "Removed workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.root.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.root.display(), error = %e, "Failed to remove workspace on drop");
            }
        }
    }
}

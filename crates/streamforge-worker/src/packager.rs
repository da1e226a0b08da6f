//! Per-job HLS packaging pipeline.

use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

use streamforge_media::{Encoder, MediaError};
use streamforge_models::keys::{self, MASTER_PLAYLIST_FILE};
use streamforge_models::{
    CachePolicy, EncodingSettings, JobId, PublishedVideo, RenditionSpec, VideoMetadata,
};
use streamforge_storage::{ObjectStorage, UploadItem};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::manifest::{build_master_playlist, parse_master_playlist};
use crate::metrics;
use crate::workspace::JobWorkspace;

/// Turns a staged source into a published HLS package.
pub struct Packager {
    encoder: Arc<dyn Encoder>,
    storage: Arc<dyn ObjectStorage>,
    ladder: Vec<RenditionSpec>,
    encoding: EncodingSettings,
    cache_policy: CachePolicy,
}

impl Packager {
    pub fn new(
        encoder: Arc<dyn Encoder>,
        storage: Arc<dyn ObjectStorage>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            encoder,
            storage,
            ladder: config.ladder.clone(),
            encoding: config.encoding.clone(),
            cache_policy: config.cache_policy.clone(),
        }
    }

    /// Probe, thumbnail, encode every rendition and publish.
    ///
    /// The master playlist is uploaded only after every rendition object is
    /// stored. Nothing here touches the registry or removes the workspace.
    pub async fn package(
        &self,
        id: &JobId,
        source: &Path,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> WorkerResult<PublishedVideo> {
        ensure_readable(source).await?;

        let metadata = self.probe(source).await?;
        logger.log_progress(&format!(
            "probed {:.2}s {}x{}",
            metadata.duration, metadata.width, metadata.height
        ));

        let thumbnail_url = self.publish_thumbnail(id, source, workspace).await?;
        logger.log_progress("thumbnail published");

        self.transcode_all(source, workspace, logger).await?;
        logger.log_progress(&format!("{} renditions encoded", self.ladder.len()));

        let master = build_master_playlist(&self.ladder);
        let master_path = workspace.hls_dir().join(MASTER_PLAYLIST_FILE);
        tokio::fs::write(&master_path, &master).await?;
        self.check_references(&master, workspace).await?;

        let items = self.rendition_uploads(id, workspace).await?;
        let uploaded = self.storage.upload_batch(items).await?;
        metrics::record_objects_uploaded(uploaded.len());
        logger.log_progress(&format!("{} rendition objects uploaded", uploaded.len()));

        let master_key = keys::master_key(id);
        let result_url = self
            .storage
            .upload(self.cached(UploadItem::bytes(master_key, master.into_bytes())))
            .await?;
        metrics::record_objects_uploaded(1);

        Ok(PublishedVideo {
            result_url,
            thumbnail_url,
            metadata,
        })
    }

    async fn probe(&self, source: &Path) -> WorkerResult<VideoMetadata> {
        let metadata = self.encoder.probe(source).await.map_err(WorkerError::Probe)?;
        if metadata.width == 0 || metadata.height == 0 {
            return Err(WorkerError::Probe(MediaError::invalid_video(
                "source has no frame size",
            )));
        }
        Ok(metadata)
    }

    async fn publish_thumbnail(
        &self,
        id: &JobId,
        source: &Path,
        workspace: &JobWorkspace,
    ) -> WorkerResult<String> {
        let output = self
            .encoder
            .thumbnail(
                source,
                self.encoding.thumbnail_offset_secs,
                self.encoding.thumbnail_size,
                &workspace.thumbnail_path(),
            )
            .await
            .map_err(WorkerError::Thumbnail)?;

        let url = self
            .storage
            .upload(self.cached(UploadItem::file(keys::thumbnail_key(id), output)))
            .await?;
        metrics::record_objects_uploaded(1);
        Ok(url)
    }

    /// Encode all renditions concurrently.
    ///
    /// The first failure flips the shared cancel signal; every encode is
    /// still awaited before returning, so no encoder writes into the
    /// workspace after this returns.
    async fn transcode_all(
        &self,
        source: &Path,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> WorkerResult<()> {
        for rendition in &self.ladder {
            tokio::fs::create_dir_all(workspace.rendition_dir(rendition)).await?;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);

        let mut encodes: FuturesUnordered<_> = self
            .ladder
            .iter()
            .map(|rendition| {
                let output_dir = workspace.rendition_dir(rendition);
                let cancel = cancel_rx.clone();
                async move {
                    let started = Instant::now();
                    self.encoder
                        .transcode(source, rendition, &self.encoding, &output_dir, cancel)
                        .await
                        .map_err(|e| WorkerError::transcode(rendition.name(), e))?;
                    metrics::record_rendition_encoded(
                        &rendition.name(),
                        started.elapsed().as_secs_f64(),
                    );
                    Ok::<_, WorkerError>(rendition.name())
                }
            })
            .collect();
        drop(cancel_rx);

        let mut first_error: Option<WorkerError> = None;
        while let Some(result) = encodes.next().await {
            match result {
                Ok(name) => logger.log_progress(&format!("{} encoded", name)),
                Err(err) if first_error.is_none() => {
                    logger.log_error(&err.to_string());
                    let _ = cancel_tx.send(true);
                    first_error = Some(err);
                }
                Err(WorkerError::Transcode {
                    source: MediaError::Cancelled,
                    ..
                }) => {}
                Err(err) => logger.log_warning(&err.to_string()),
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Every variant URI in the master must exist on disk.
    async fn check_references(&self, master: &str, workspace: &JobWorkspace) -> WorkerResult<()> {
        for variant in parse_master_playlist(master) {
            let path = workspace.hls_dir().join(&variant.uri);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                let rendition = variant
                    .uri
                    .split('/')
                    .next()
                    .unwrap_or(variant.uri.as_str())
                    .to_string();
                return Err(WorkerError::transcode(rendition, MediaError::FileNotFound(path)));
            }
        }
        Ok(())
    }

    async fn rendition_uploads(
        &self,
        id: &JobId,
        workspace: &JobWorkspace,
    ) -> WorkerResult<Vec<UploadItem>> {
        let mut items = Vec::new();

        for rendition in &self.ladder {
            let dir = workspace.rendition_dir(rendition);
            let prefix = keys::rendition_prefix(id, rendition);

            for path in list_files(&dir).await? {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let key = format!("{}/{}", prefix, name);
                items.push(self.cached(UploadItem::file(key, path.clone())));
            }
        }

        Ok(items)
    }

    /// Attach the cache-control header the policy assigns to the item's key.
    fn cached(&self, item: UploadItem) -> UploadItem {
        let cache_control = self.cache_policy.for_key(&item.key).to_string();
        item.with_cache_control(cache_control)
    }
}

async fn ensure_readable(source: &Path) -> WorkerResult<()> {
    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => {
            // Opening catches permission problems that metadata does not
            tokio::fs::File::open(source)
                .await
                .map_err(|_| WorkerError::SourceMissing(source.to_path_buf()))?;
            Ok(())
        }
        _ => Err(WorkerError::SourceMissing(source.to_path_buf())),
    }
}

/// Regular files directly inside `dir`, sorted by name.
async fn list_files(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

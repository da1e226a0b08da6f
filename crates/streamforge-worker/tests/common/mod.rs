//! Shared fixtures for worker integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::watch;

use streamforge_media::{Encoder, MediaError, MediaResult};
use streamforge_models::{
    keys, EncodingSettings, FrameSize, JobId, JobRecord, RenditionSpec, VideoMetadata,
};
use streamforge_storage::MemoryStorage;
use streamforge_worker::{
    InMemoryJobRegistry, JobRegistry, JobService, RegistryError, RegistryResult, Scheduler,
    WorkerConfig,
};

/// Scripted stand-in for FFmpeg.
pub struct FakeEncoder {
    metadata: VideoMetadata,
    failing_rendition: Option<String>,
    failing_probe: bool,
    failing_thumbnail: bool,
    encode_delay: Duration,
    transcodes: AtomicUsize,
    cancelled: AtomicUsize,
    active_sources: Mutex<HashMap<PathBuf, usize>>,
    max_parallel_sources: AtomicUsize,
}

impl FakeEncoder {
    pub fn new(metadata: VideoMetadata) -> Self {
        Self {
            metadata,
            failing_rendition: None,
            failing_probe: false,
            failing_thumbnail: false,
            encode_delay: Duration::from_millis(5),
            transcodes: AtomicUsize::new(0),
            cancelled: AtomicUsize::new(0),
            active_sources: Mutex::new(HashMap::new()),
            max_parallel_sources: AtomicUsize::new(0),
        }
    }

    pub fn hd() -> Self {
        Self::new(VideoMetadata {
            duration: 12.5,
            width: 1920,
            height: 1080,
        })
    }

    /// `name` fails with "decode failed" shortly after starting.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing_rendition = Some(name.to_string());
        self
    }

    /// Probe reports an unrecognizable container.
    pub fn failing_probe(mut self) -> Self {
        self.failing_probe = true;
        self
    }

    /// Frame extraction fails before writing anything.
    pub fn failing_thumbnail(mut self) -> Self {
        self.failing_thumbnail = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.encode_delay = delay;
        self
    }

    pub fn transcodes(&self) -> usize {
        self.transcodes.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Most distinct sources ever encoding at the same moment.
    pub fn max_parallel_sources(&self) -> usize {
        self.max_parallel_sources.load(Ordering::SeqCst)
    }

    fn enter(&self, source: &Path) {
        let mut active = self.active_sources.lock().unwrap();
        *active.entry(source.to_path_buf()).or_insert(0) += 1;
        self.max_parallel_sources
            .fetch_max(active.len(), Ordering::SeqCst);
    }

    fn leave(&self, source: &Path) {
        let mut active = self.active_sources.lock().unwrap();
        if let Some(count) = active.get_mut(source) {
            *count -= 1;
            if *count == 0 {
                active.remove(source);
            }
        }
    }
}

async fn cancelled(mut cancel: watch::Receiver<bool>) {
    let signalled = cancel.wait_for(|c| *c).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn probe(&self, _path: &Path) -> MediaResult<VideoMetadata> {
        if self.failing_probe {
            return Err(MediaError::FfprobeFailed {
                message: "moov atom not found".to_string(),
                stderr: None,
            });
        }
        Ok(self.metadata)
    }

    async fn thumbnail(
        &self,
        _path: &Path,
        _at_seconds: f64,
        _size: FrameSize,
        output: &Path,
    ) -> MediaResult<PathBuf> {
        if self.failing_thumbnail {
            return Err(MediaError::ffmpeg_failed("no frame at offset", None, Some(1)));
        }
        tokio::fs::write(output, b"jpeg").await?;
        Ok(output.to_path_buf())
    }

    async fn transcode(
        &self,
        path: &Path,
        rendition: &RenditionSpec,
        _settings: &EncodingSettings,
        output_dir: &Path,
        cancel: watch::Receiver<bool>,
    ) -> MediaResult<PathBuf> {
        self.transcodes.fetch_add(1, Ordering::SeqCst);
        self.enter(path);

        let result = if self.failing_rendition.as_deref() == Some(rendition.name().as_str()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(MediaError::ffmpeg_failed("decode failed", None, Some(1)))
        } else {
            tokio::select! {
                _ = tokio::time::sleep(self.encode_delay) => Ok(()),
                _ = cancelled(cancel) => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                    Err(MediaError::Cancelled)
                }
            }
        };

        self.leave(path);
        result?;

        let playlist = output_dir.join(keys::PLAYLIST_FILE);
        tokio::fs::write(&playlist, b"#EXTM3U\n#EXTINF:6.0,\nsegment0.ts\n").await?;
        tokio::fs::write(output_dir.join("segment0.ts"), b"ts").await?;
        Ok(playlist)
    }
}

/// Registry whose scans or terminal writes can be made to fail.
#[derive(Default)]
pub struct FlakyRegistry {
    inner: InMemoryJobRegistry,
    fail_list: AtomicBool,
    fail_terminal_puts: AtomicBool,
}

impl FlakyRegistry {
    pub fn set_failing(&self, failing: bool) {
        self.fail_list.store(failing, Ordering::SeqCst);
    }

    /// Refuse writes of `ready` and `error` records.
    pub fn set_failing_terminal_writes(&self, failing: bool) {
        self.fail_terminal_puts.store(failing, Ordering::SeqCst);
    }
}

impl JobRegistry for FlakyRegistry {
    fn put(&self, id: &JobId, record: JobRecord) -> RegistryResult<()> {
        if record.status.is_terminal() && self.fail_terminal_puts.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("write refused".to_string()));
        }
        self.inner.put(id, record)
    }

    fn insert_new(&self, id: &JobId, record: JobRecord) -> RegistryResult<()> {
        self.inner.insert_new(id, record)
    }

    fn get(&self, id: &JobId) -> RegistryResult<Option<JobRecord>> {
        self.inner.get(id)
    }

    fn list(&self) -> RegistryResult<Vec<(JobId, JobRecord)>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("scan refused".to_string()));
        }
        self.inner.list()
    }
}

/// A scheduler wired to in-process collaborators.
pub struct Harness<R: JobRegistry + 'static = InMemoryJobRegistry> {
    pub registry: Arc<R>,
    pub storage: Arc<MemoryStorage>,
    pub encoder: Arc<FakeEncoder>,
    pub service: JobService,
    pub scheduler: Scheduler,
    pub scratch: TempDir,
}

impl Harness {
    pub fn new(encoder: FakeEncoder) -> Self {
        Self::with_registry(encoder, InMemoryJobRegistry::new())
    }
}

impl<R: JobRegistry + 'static> Harness<R> {
    pub fn with_registry(encoder: FakeEncoder, registry: R) -> Self {
        let scratch = TempDir::new().unwrap();
        let config = WorkerConfig {
            poll_interval: Duration::from_millis(20),
            work_dir: scratch.path().to_path_buf(),
            ..WorkerConfig::default()
        };

        let registry = Arc::new(registry);
        let storage = Arc::new(MemoryStorage::new("https://cdn.example.com"));
        let encoder = Arc::new(encoder);

        let service = JobService::new(registry.clone(), storage.clone(), config.ladder.clone());
        let scheduler = Scheduler::new(registry.clone(), storage.clone(), encoder.clone(), &config);

        Self {
            registry,
            storage,
            encoder,
            service,
            scheduler,
            scratch,
        }
    }

    /// Store an original and enqueue a job for it.
    pub fn submit(&self, id: &str, title: &str) -> JobId {
        let id = JobId::from(id);
        let source_key = keys::source_key(&id, "mp4");
        self.storage.insert(source_key.clone(), b"fake video".to_vec());
        self.service.enqueue(&id, title, "", &source_key).unwrap();
        id
    }

    /// Enqueue a job whose original was never stored.
    pub fn submit_without_source(&self, id: &str) -> JobId {
        let id = JobId::from(id);
        let source_key = keys::source_key(&id, "mp4");
        self.service.enqueue(&id, "Lost", "", &source_key).unwrap();
        id
    }

    pub fn workspace_path(&self, id: &JobId) -> PathBuf {
        self.scratch.path().join(id.as_str())
    }
}

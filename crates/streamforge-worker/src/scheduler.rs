//! Polling worker loop.
//!
//! The scheduler wakes on a fixed period, drains every pending job one at a
//! time, and writes each job's final status. It is the only writer of
//! `processing`, `ready` and `error` records.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Instrument};

use streamforge_media::Encoder;
use streamforge_models::{JobId, JobRecord, JobStatus, PublishedVideo};
use streamforge_storage::ObjectStorage;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::packager::Packager;
use crate::registry::JobRegistry;
use crate::workspace::JobWorkspace;

/// What one firing did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FiringReport {
    /// Jobs driven to a terminal status
    pub processed: usize,
    /// True when the firing did nothing because another was in flight
    pub skipped: bool,
}

impl FiringReport {
    fn skipped() -> Self {
        Self {
            processed: 0,
            skipped: true,
        }
    }
}

struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the worker loop task.
pub struct Scheduler {
    worker: Arc<Worker>,
    handle: Mutex<Option<LoopHandle>>,
}

struct Worker {
    registry: Arc<dyn JobRegistry>,
    storage: Arc<dyn ObjectStorage>,
    packager: Packager,
    poll_interval: Duration,
    work_dir: PathBuf,
    delete_source: bool,
    busy: AtomicBool,
}

/// Clears the busy flag when a firing ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        storage: Arc<dyn ObjectStorage>,
        encoder: Arc<dyn Encoder>,
        config: &WorkerConfig,
    ) -> Self {
        let packager = Packager::new(encoder, Arc::clone(&storage), config);
        Self {
            worker: Arc::new(Worker {
                registry,
                storage,
                packager,
                poll_interval: config.poll_interval,
                work_dir: config.work_dir.clone(),
                delete_source: config.delete_source_after_processing,
                busy: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Start the loop. Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        if handle.as_ref().is_some_and(|h| !h.task.is_finished()) {
            debug!("Scheduler already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = Arc::clone(&self.worker);
        let task = tokio::spawn(async move { worker.run_loop(stop_rx).await });

        info!(
            "Scheduler started, polling every {:?}",
            self.worker.poll_interval
        );
        *handle = Some(LoopHandle { stop_tx, task });
        true
    }

    /// Cancel future firings. A job already in flight runs to completion.
    pub fn stop(&self) {
        if let Some(handle) = self.take_handle() {
            let _ = handle.stop_tx.send(true);
            info!("Scheduler stop requested");
        }
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.take_handle() {
            let _ = handle.stop_tx.send(true);
            if let Err(e) = handle.task.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
            info!("Scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    /// Perform one firing now.
    pub async fn run_once(&self) -> WorkerResult<FiringReport> {
        self.worker.fire(None).await
    }

    fn take_handle(&self) -> Option<LoopHandle> {
        self.handle.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl Worker {
    async fn run_loop(&self, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.fire(Some(&stop_rx)).await {
                        Ok(report) if report.processed > 0 => {
                            info!("Firing processed {} job(s)", report.processed);
                        }
                        Ok(_) => {}
                        Err(e) => error!("Firing aborted: {}", e),
                    }
                }
            }
        }

        debug!("Scheduler loop exited");
    }

    /// Drain pending jobs, oldest first, one at a time.
    ///
    /// Errors reading or writing the registry abort the firing. Errors inside a
    /// job become that job's `error` status.
    async fn fire(&self, stop: Option<&watch::Receiver<bool>>) -> WorkerResult<FiringReport> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous firing still in flight, skipping");
            metrics::record_firing_skipped();
            return Ok(FiringReport::skipped());
        }
        let _busy = BusyGuard(&self.busy);

        let mut report = FiringReport::default();
        loop {
            if stop.is_some_and(|rx| *rx.borrow()) {
                debug!("Stop requested, ending firing");
                break;
            }

            let Some((id, record)) = self.next_pending()? else {
                break;
            };

            // Claimed before any I/O
            let processing = record.start_processing()?;
            self.registry.put(&id, processing.clone())?;

            self.process_job(&id, processing).await?;
            report.processed += 1;
        }

        Ok(report)
    }

    fn next_pending(&self) -> WorkerResult<Option<(JobId, JobRecord)>> {
        let pending: Vec<(JobId, JobRecord)> = self
            .registry
            .list()?
            .into_iter()
            .filter(|(_, record)| record.status == JobStatus::Pending)
            .collect();
        metrics::set_pending_jobs(pending.len());

        Ok(pending.into_iter().min_by(|(a_id, a), (b_id, b)| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a_id.cmp(b_id))
        }))
    }

    /// Run the pipeline for a claimed job and write its terminal status.
    ///
    /// Only a failure to record the outcome is returned.
    async fn process_job(&self, id: &JobId, record: JobRecord) -> WorkerResult<()> {
        let logger = JobLogger::new(id, "package");
        let span = logger.create_span();

        self.drive_job(id, &record, &logger).instrument(span).await
    }

    async fn drive_job(
        &self,
        id: &JobId,
        record: &JobRecord,
        logger: &JobLogger,
    ) -> WorkerResult<()> {
        logger.log_start(&record.title);

        let outcome = self.run_pipeline(id, record, logger).await;
        let succeeded = outcome.is_ok();

        let next = match outcome {
            Ok(published) => {
                metrics::record_job_completed(logger.elapsed_secs());
                record.complete(published)?
            }
            Err(err) => {
                logger.log_error(&err.to_string());
                metrics::record_job_failed(err.stage(), logger.elapsed_secs());
                record.fail(err.to_string())?
            }
        };

        if let Err(e) = self.registry.put(id, next) {
            logger.log_error(&format!("cannot write final status: {}", e));
            return Err(e.into());
        }

        if succeeded {
            logger.log_completion("ready");
            if self.delete_source {
                self.delete_source(&record.source_key, logger).await;
            }
        }

        Ok(())
    }

    /// Stage the source, package it, and remove the workspace either way.
    async fn run_pipeline(
        &self,
        id: &JobId,
        record: &JobRecord,
        logger: &JobLogger,
    ) -> WorkerResult<PublishedVideo> {
        let workspace = JobWorkspace::create(&self.work_dir, id).await?;
        let result = self.stage_and_package(id, record, &workspace, logger).await;
        workspace.cleanup().await;
        result
    }

    async fn stage_and_package(
        &self,
        id: &JobId,
        record: &JobRecord,
        workspace: &JobWorkspace,
        logger: &JobLogger,
    ) -> WorkerResult<PublishedVideo> {
        let extension = Path::new(&record.source_key)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let source = workspace.source_path(extension);

        self.storage.download_to(&record.source_key, &source).await?;
        logger.log_progress("source staged");

        self.packager.package(id, &source, workspace, logger).await
    }

    async fn delete_source(&self, key: &str, logger: &JobLogger) {
        match self.storage.delete(key).await {
            Ok(()) => debug!(key, "Deleted uploaded original"),
            Err(e) => {
                warn!(key, error = %e, "Failed to delete uploaded original");
                logger.log_warning("original upload not deleted");
            }
        }
    }
}

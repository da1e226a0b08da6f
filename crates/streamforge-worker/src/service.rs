//! Ingestion-side facade over the registry.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::info;

use streamforge_models::{keys, JobId, JobRecord, JobStatus, RenditionSpec};
use streamforge_storage::ObjectStorage;

use crate::error::{WorkerError, WorkerResult};
use crate::registry::JobRegistry;

/// Public URLs a job will have once it is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedUrls {
    pub video: String,
    pub thumbnail: String,
    /// Serialized as a `name -> url` map in ladder order
    #[serde(serialize_with = "variants_by_name")]
    pub variants: Vec<VariantUrl>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantUrl {
    pub name: String,
    pub resolution: String,
    pub url: String,
}

fn variants_by_name<S: Serializer>(variants: &[VariantUrl], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(variants.iter().map(|v| (&v.name, &v.url)))
}

/// Records grouped by status, newest first within each group.
#[derive(Debug, Clone, Default)]
pub struct JobListing {
    pub ready: Vec<(JobId, JobRecord)>,
    pub processing: Vec<(JobId, JobRecord)>,
    pub pending: Vec<(JobId, JobRecord)>,
    pub error: Vec<(JobId, JobRecord)>,
}

impl JobListing {
    pub fn total(&self) -> usize {
        self.ready.len() + self.processing.len() + self.pending.len() + self.error.len()
    }

    pub fn group(&self, status: JobStatus) -> &[(JobId, JobRecord)] {
        match status {
            JobStatus::Ready => &self.ready,
            JobStatus::Processing => &self.processing,
            JobStatus::Pending => &self.pending,
            JobStatus::Error => &self.error,
        }
    }

    fn group_mut(&mut self, status: JobStatus) -> &mut Vec<(JobId, JobRecord)> {
        match status {
            JobStatus::Ready => &mut self.ready,
            JobStatus::Processing => &mut self.processing,
            JobStatus::Pending => &mut self.pending,
            JobStatus::Error => &mut self.error,
        }
    }
}

/// Creates jobs and answers status queries.
///
/// Never writes anything but fresh `pending` records; every later transition
/// belongs to the scheduler.
#[derive(Clone)]
pub struct JobService {
    registry: Arc<dyn JobRegistry>,
    storage: Arc<dyn ObjectStorage>,
    ladder: Vec<RenditionSpec>,
}

impl JobService {
    pub fn new(
        registry: Arc<dyn JobRegistry>,
        storage: Arc<dyn ObjectStorage>,
        ladder: Vec<RenditionSpec>,
    ) -> Self {
        Self {
            registry,
            storage,
            ladder,
        }
    }

    /// Create a `pending` record for an original already stored at `source_key`.
    pub fn enqueue(
        &self,
        id: &JobId,
        title: &str,
        description: &str,
        source_key: &str,
    ) -> WorkerResult<JobRecord> {
        let record = JobRecord::new(title, description, source_key);
        self.registry.insert_new(id, record.clone())?;
        info!(job_id = %id, title = %record.title, "Job enqueued");
        Ok(record)
    }

    pub fn get_status(&self, id: &JobId) -> WorkerResult<JobRecord> {
        self.registry
            .get(id)?
            .ok_or_else(|| WorkerError::JobNotFound(id.to_string()))
    }

    pub fn list_all(&self) -> WorkerResult<JobListing> {
        let mut listing = JobListing::default();
        for (id, record) in self.registry.list()? {
            listing.group_mut(record.status).push((id, record));
        }

        for status in JobStatus::ALL {
            listing
                .group_mut(status)
                .sort_by(|(a_id, a), (b_id, b)| {
                    b.created_at.cmp(&a.created_at).then_with(|| a_id.cmp(b_id))
                });
        }

        Ok(listing)
    }

    pub fn expected_urls(&self, id: &JobId) -> ExpectedUrls {
        ExpectedUrls {
            video: self.storage.public_url(&keys::master_key(id)),
            thumbnail: self.storage.public_url(&keys::thumbnail_key(id)),
            variants: self
                .ladder
                .iter()
                .map(|rendition| VariantUrl {
                    name: rendition.name(),
                    resolution: rendition.resolution(),
                    url: self
                        .storage
                        .public_url(&keys::rendition_playlist_key(id, rendition)),
                })
                .collect(),
        }
    }

    pub fn ladder(&self) -> &[RenditionSpec] {
        &self.ladder
    }
}

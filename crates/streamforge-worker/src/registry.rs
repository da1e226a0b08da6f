//! Job registry.
//!
//! The registry is the only state shared between the ingestion API and the
//! worker loop. Records are replaced whole, never patched in place.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use streamforge_models::{JobId, JobRecord};

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Job already exists: {0}")]
    AlreadyExists(JobId),

    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Keyed store of job records.
///
/// Methods never block on I/O. Absence is `Ok(None)`, not an error.
pub trait JobRegistry: Send + Sync {
    /// Insert or fully replace a record.
    fn put(&self, id: &JobId, record: JobRecord) -> RegistryResult<()>;

    /// Insert only if `id` is absent.
    fn insert_new(&self, id: &JobId, record: JobRecord) -> RegistryResult<()>;

    fn get(&self, id: &JobId) -> RegistryResult<Option<JobRecord>>;

    /// Snapshot of every record, in no particular order.
    fn list(&self) -> RegistryResult<Vec<(JobId, JobRecord)>>;
}

/// Process-local registry. State is lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    records: RwLock<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A writer never leaves a half-written record, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobRegistry for InMemoryJobRegistry {
    fn put(&self, id: &JobId, record: JobRecord) -> RegistryResult<()> {
        self.write().insert(id.clone(), record);
        Ok(())
    }

    fn insert_new(&self, id: &JobId, record: JobRecord) -> RegistryResult<()> {
        let mut records = self.write();
        if records.contains_key(id) {
            return Err(RegistryError::AlreadyExists(id.clone()));
        }
        records.insert(id.clone(), record);
        Ok(())
    }

    fn get(&self, id: &JobId) -> RegistryResult<Option<JobRecord>> {
        Ok(self.read().get(id).cloned())
    }

    fn list(&self) -> RegistryResult<Vec<(JobId, JobRecord)>> {
        Ok(self
            .read()
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamforge_models::JobStatus;

    fn record() -> JobRecord {
        JobRecord::new("Demo", "", "uploads/x/original.mp4")
    }

    #[test]
    fn test_get_missing_is_none() {
        let registry = InMemoryJobRegistry::new();
        assert!(registry.get(&JobId::from("missing")).unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_put_replaces_whole_record() {
        let registry = InMemoryJobRegistry::new();
        let id = JobId::from("abc123");
        registry.put(&id, record()).unwrap();

        let processing = registry.get(&id).unwrap().unwrap().start_processing().unwrap();
        registry.put(&id, processing).unwrap();

        assert_eq!(registry.get(&id).unwrap().unwrap().status, JobStatus::Processing);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let registry = InMemoryJobRegistry::new();
        let id = JobId::from("abc123");
        registry.insert_new(&id, record()).unwrap();
        assert!(matches!(
            registry.insert_new(&id, record()),
            Err(RegistryError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let registry = InMemoryJobRegistry::new();
        registry.put(&JobId::from("a"), record()).unwrap();
        registry.put(&JobId::from("b"), record()).unwrap();

        let snapshot = registry.list().unwrap();
        registry.put(&JobId::from("c"), record()).unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.list().unwrap().len(), 3);
    }
}

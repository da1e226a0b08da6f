//! In-process storage backend for local runs and tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::object::{join_url, ObjectMetadata, ObjectStorage, UploadBody, UploadItem};

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: Option<String>,
}

/// [`ObjectStorage`] that keeps objects in a map.
///
/// Keeps a log of successful puts in order, and can be told to fail any
/// operation whose key contains a given fragment.
#[derive(Debug)]
pub struct MemoryStorage {
    base_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    put_log: Mutex<Vec<String>>,
    failing: RwLock<HashSet<String>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new("memory://streamforge")
    }
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: RwLock::new(HashMap::new()),
            put_log: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make every operation on keys containing `fragment` fail.
    pub fn fail_keys_containing(&self, fragment: impl Into<String>) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(fragment.into());
    }

    /// Store an object directly, bypassing fault injection and the put log.
    pub fn insert(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        let key = key.into();
        let object = StoredObject {
            content_type: crate::object::content_type_for(&key).to_string(),
            body: body.into(),
            cache_control: None,
        };
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, object);
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Sorted keys currently stored under `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Keys of successful puts, oldest first.
    pub fn put_log(&self) -> Vec<String> {
        self.put_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn check_fault(&self, key: &str) -> Option<String> {
        self.failing
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|fragment| key.contains(fragment.as_str()))
            .map(|fragment| format!("injected failure for '{}'", fragment))
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(&self, item: UploadItem) -> StorageResult<String> {
        if let Some(message) = self.check_fault(&item.key) {
            return Err(StorageError::upload_failed(&item.key, message));
        }

        let body = match item.body {
            UploadBody::Bytes(data) => data,
            UploadBody::File(path) => tokio::fs::read(&path)
                .await
                .map_err(|e| StorageError::upload_failed(&item.key, e.to_string()))?,
        };

        debug!("Stored {} bytes at {}", body.len(), item.key);

        self.objects.write().unwrap_or_else(|e| e.into_inner()).insert(
            item.key.clone(),
            StoredObject {
                body,
                content_type: item.content_type,
                cache_control: item.cache_control,
            },
        );
        self.put_log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(item.key.clone());

        Ok(self.public_url(&item.key))
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        if let Some(message) = self.check_fault(key) {
            return Err(StorageError::download_failed(message));
        }
        self.get(key)
            .map(|object| object.body)
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn download_to(&self, key: &str, path: &Path) -> StorageResult<()> {
        let body = self.download(key).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        if let Some(message) = self.check_fault(key) {
            return Err(StorageError::delete_failed(message));
        }
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }

    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        Ok(self.get(key).map(|object| ObjectMetadata {
            size: object.body.len() as u64,
            content_type: Some(object.content_type),
            cache_control: object.cache_control,
        }))
    }

    fn public_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_download_roundtrip() {
        let storage = MemoryStorage::new("https://cdn.example.com");
        let url = storage
            .upload(UploadItem::bytes("thumbnails/a.jpg", b"jpeg".to_vec()))
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/thumbnails/a.jpg");
        assert_eq!(storage.download("thumbnails/a.jpg").await.unwrap(), b"jpeg");

        let head = storage.head("thumbnails/a.jpg").await.unwrap().unwrap();
        assert_eq!(head.size, 4);
        assert_eq!(head.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_missing_object() {
        let storage = MemoryStorage::default();
        assert!(storage.download("nope").await.unwrap_err().is_not_found());
        assert!(storage.head("nope").await.unwrap().is_none());
        assert!(storage.delete("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_file_upload_and_download_to() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("segment0.ts");
        tokio::fs::write(&source, b"ts-data").await.unwrap();

        let storage = MemoryStorage::default();
        storage
            .upload(UploadItem::file("videos/a/720p/segment0.ts", &source))
            .await
            .unwrap();
        assert_eq!(
            storage.get("videos/a/720p/segment0.ts").unwrap().content_type,
            "video/MP2T"
        );

        let target = dir.path().join("nested/copy.ts");
        storage
            .download_to("videos/a/720p/segment0.ts", &target)
            .await
            .unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"ts-data");
    }

    #[tokio::test]
    async fn test_batch_upload() {
        let storage = MemoryStorage::default();
        let items = (0..20)
            .map(|i| UploadItem::bytes(format!("videos/a/240p/segment{}.ts", i), vec![i as u8]))
            .collect();

        let uploaded = storage.upload_batch(items).await.unwrap();
        assert_eq!(uploaded.len(), 20);
        assert_eq!(storage.keys_with_prefix("videos/a/240p/").len(), 20);
        assert!(uploaded.iter().all(|o| o.url.ends_with(&o.key)));
    }

    #[tokio::test]
    async fn test_batch_fails_on_first_error() {
        let storage = MemoryStorage::default();
        storage.fail_keys_containing("segment3");
        let items = (0..5)
            .map(|i| UploadItem::bytes(format!("videos/a/240p/segment{}.ts", i), vec![0]))
            .collect();

        let err = storage.upload_batch(items).await.unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed { ref key, .. } if key.contains("segment3")));
        assert!(!storage.contains("videos/a/240p/segment3.ts"));
    }
}

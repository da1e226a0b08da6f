//! The object storage seam.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Default number of concurrent puts in a batch.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 8;

/// Payload of a put.
#[derive(Debug, Clone)]
pub enum UploadBody {
    Bytes(Vec<u8>),
    File(PathBuf),
}

/// One object to put.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub key: String,
    pub body: UploadBody,
    pub content_type: String,
    pub cache_control: Option<String>,
}

impl UploadItem {
    /// Upload a local file, inferring the content type from the key.
    pub fn file(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let key = key.into();
        Self {
            content_type: content_type_for(&key).to_string(),
            key,
            body: UploadBody::File(path.into()),
            cache_control: None,
        }
    }

    /// Upload in-memory bytes, inferring the content type from the key.
    pub fn bytes(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        Self {
            content_type: content_type_for(&key).to_string(),
            key,
            body: UploadBody::Bytes(data.into()),
            cache_control: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }
}

/// Result of one successful put.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub key: String,
    pub url: String,
}

/// What `head` reports about a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Bucket-level operations used by the ingestion API and the worker.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Put one object and return its public URL.
    async fn upload(&self, item: UploadItem) -> StorageResult<String>;

    /// Fetch an object into memory.
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Fetch an object into a local file, creating parent directories.
    async fn download_to(&self, key: &str, path: &Path) -> StorageResult<()>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Metadata of an object, `None` when absent.
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>>;

    /// Public URL of a key. Pure, the object need not exist.
    fn public_url(&self, key: &str) -> String;

    /// Bound on concurrent puts in [`ObjectStorage::upload_batch`].
    fn upload_concurrency(&self) -> usize {
        DEFAULT_UPLOAD_CONCURRENCY
    }

    /// Put many objects. Fails on the first error; results are in completion order.
    async fn upload_batch(&self, items: Vec<UploadItem>) -> StorageResult<Vec<UploadedObject>> {
        let concurrency = self.upload_concurrency().max(1);

        stream::iter(items)
            .map(|item| async move {
                let key = item.key.clone();
                let url = self.upload(item).await?;
                Ok::<_, StorageError>(UploadedObject { key, url })
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await
    }
}

/// Content type for a key by extension.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = Path::new(key)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("m3u8") => "application/x-mpegURL",
        Some("ts") => "video/MP2T",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Join a public base URL and a key.
pub fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("videos/a/master.m3u8"), "application/x-mpegURL");
        assert_eq!(content_type_for("videos/a/720p/segment3.ts"), "video/MP2T");
        assert_eq!(content_type_for("thumbnails/a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("thumbnails/a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("uploads/a/original"), "application/octet-stream");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://cdn.example.com/", "/videos/a/master.m3u8"),
            "https://cdn.example.com/videos/a/master.m3u8"
        );
    }

    #[test]
    fn test_upload_item_builders() {
        let item = UploadItem::bytes("videos/a/master.m3u8", "#EXTM3U")
            .with_cache_control("public, max-age=60");
        assert_eq!(item.content_type, "application/x-mpegURL");
        assert_eq!(item.cache_control.as_deref(), Some("public, max-age=60"));
        assert!(matches!(item.body, UploadBody::Bytes(ref b) if b == b"#EXTM3U"));
    }
}

//! Object storage for published HLS packages.
//!
//! This crate provides:
//! - The [`ObjectStorage`] trait (put/get/delete/head/batch-put, public URLs)
//! - An S3 backend built on the AWS SDK, with CloudFront-style public URLs
//! - An in-memory backend for local runs and tests
//! - Content-type selection by key extension

pub mod config;
pub mod error;
pub mod memory;
pub mod object;
pub mod s3;

pub use config::{StorageBackend, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use memory::{MemoryStorage, StoredObject};
pub use object::{
    content_type_for, ObjectMetadata, ObjectStorage, UploadBody, UploadItem, UploadedObject,
    DEFAULT_UPLOAD_CONCURRENCY,
};
pub use s3::{S3Config, S3Storage};

//! Backend selection.

use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryStorage;
use crate::object::ObjectStorage;
use crate::s3::{S3Config, S3Storage};

/// Which object store the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3),
            "memory" => Ok(Self::Memory),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND '{}', expected 's3' or 'memory'",
                other
            ))),
        }
    }
}

/// Storage settings read at startup.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    S3(S3Config),
    Memory { base_url: String },
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let backend = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StorageBackend::default(),
        };

        match backend {
            StorageBackend::S3 => Ok(Self::S3(S3Config::from_env()?)),
            StorageBackend::Memory => Ok(Self::Memory {
                base_url: std::env::var("MEMORY_STORAGE_BASE_URL")
                    .unwrap_or_else(|_| "memory://streamforge".to_string()),
            }),
        }
    }

    pub fn backend(&self) -> StorageBackend {
        match self {
            Self::S3(_) => StorageBackend::S3,
            Self::Memory { .. } => StorageBackend::Memory,
        }
    }

    /// Build the configured backend.
    ///
    /// An unreachable S3 bucket is logged, not fatal.
    pub async fn connect(self) -> Arc<dyn ObjectStorage> {
        match self {
            Self::S3(config) => {
                info!(bucket = %config.bucket_name, region = %config.region, "Using S3 storage");
                let storage = S3Storage::new(config);
                match storage.check_connectivity().await {
                    Ok(()) => info!("S3 bucket reachable"),
                    Err(e) => warn!(error = %e, "S3 connectivity check failed"),
                }
                Arc::new(storage)
            }
            Self::Memory { base_url } => {
                info!(base_url = %base_url, "Using in-memory storage");
                Arc::new(MemoryStorage::new(base_url))
            }
        }
    }
}

//! Application state.

use std::sync::Arc;

use streamforge_models::CachePolicy;
use streamforge_storage::ObjectStorage;
use streamforge_worker::JobService;

use crate::config::ApiConfig;
use crate::error::hide_error_details;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: JobService,
    pub storage: Arc<dyn ObjectStorage>,
    /// Cache headers for uploaded originals
    pub cache_policy: CachePolicy,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        service: JobService,
        storage: Arc<dyn ObjectStorage>,
        cache_policy: CachePolicy,
    ) -> Self {
        hide_error_details(config.is_production());
        Self {
            config,
            service,
            storage,
            cache_policy,
        }
    }
}

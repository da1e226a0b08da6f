//! Axum HTTP ingestion API.
//!
//! This crate provides:
//! - Multipart video upload that stores the original and enqueues a job
//! - Status polling and grouped listing
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{AllowedVideoTypes, ApiConfig};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

//! HLS packaging worker.
//!
//! This crate provides:
//! - The job registry shared with the ingestion API
//! - The per-job packaging pipeline (probe, thumbnail, renditions, manifest)
//! - The polling scheduler that drives jobs to a terminal status
//! - The `JobService` facade used by the API

pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod packager;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use manifest::{build_master_playlist, parse_master_playlist, VariantEntry};
pub use packager::Packager;
pub use registry::{InMemoryJobRegistry, JobRegistry, RegistryError, RegistryResult};
pub use scheduler::{FiringReport, Scheduler};
pub use service::{ExpectedUrls, JobListing, JobService, VariantUrl};
pub use workspace::JobWorkspace;

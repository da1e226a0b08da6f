//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder that exports them.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_COMPLETED_TOTAL: &str = "streamforge_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "streamforge_jobs_failed_total";
    pub const JOB_DURATION_SECONDS: &str = "streamforge_job_duration_seconds";
    pub const RENDITION_ENCODE_SECONDS: &str = "streamforge_rendition_encode_seconds";
    pub const OBJECTS_UPLOADED_TOTAL: &str = "streamforge_objects_uploaded_total";
    pub const FIRINGS_SKIPPED_TOTAL: &str = "streamforge_scheduler_firings_skipped_total";
    pub const PENDING_JOBS: &str = "streamforge_pending_jobs";
}

pub fn record_job_completed(duration_secs: f64) {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "ready").record(duration_secs);
}

/// Record job failed, labelled by the stage that failed.
pub fn record_job_failed(stage: &'static str, duration_secs: f64) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage).increment(1);
    histogram!(names::JOB_DURATION_SECONDS, "outcome" => "error").record(duration_secs);
}

pub fn record_rendition_encoded(rendition: &str, duration_secs: f64) {
    let labels = [("rendition", rendition.to_string())];
    histogram!(names::RENDITION_ENCODE_SECONDS, &labels).record(duration_secs);
}

pub fn record_objects_uploaded(count: usize) {
    counter!(names::OBJECTS_UPLOADED_TOTAL).increment(count as u64);
}

pub fn record_firing_skipped() {
    counter!(names::FIRINGS_SKIPPED_TOTAL).increment(1);
}

pub fn set_pending_jobs(count: usize) {
    gauge!(names::PENDING_JOBS).set(count as f64);
}

//! End-to-end packaging runs against a fake encoder and in-memory storage.

mod common;

use std::time::Duration;

use common::{FakeEncoder, FlakyRegistry, Harness};
use streamforge_models::{keys, JobId, JobStatus, VideoMetadata};
use streamforge_worker::{parse_master_playlist, JobRegistry};

#[tokio::test]
async fn test_job_becomes_ready_with_full_package() {
    let harness = Harness::new(FakeEncoder::hd());
    let id = harness.submit("abc123", "Demo");

    let report = harness.scheduler.run_once().await.unwrap();
    assert_eq!(report.processed, 1);
    assert!(!report.skipped);

    let record = harness.service.get_status(&id).unwrap();
    assert_eq!(record.status, JobStatus::Ready);
    assert_eq!(record.title, "Demo");

    let published = record.published.as_ref().unwrap();
    assert_eq!(published.metadata.duration, 12.5);
    assert_eq!(published.metadata.width, 1920);
    assert_eq!(published.metadata.height, 1080);
    assert_eq!(
        published.result_url,
        "https://cdn.example.com/videos/abc123/master.m3u8"
    );
    assert_eq!(
        published.thumbnail_url,
        "https://cdn.example.com/thumbnails/abc123.jpg"
    );

    let master = harness.storage.get(&keys::master_key(&id)).unwrap();
    let master_text = String::from_utf8(master.body).unwrap();
    let uris: Vec<String> = parse_master_playlist(&master_text)
        .into_iter()
        .map(|v| v.uri)
        .collect();
    assert_eq!(
        uris,
        vec![
            "1080p/playlist.m3u8",
            "720p/playlist.m3u8",
            "480p/playlist.m3u8",
            "360p/playlist.m3u8",
            "240p/playlist.m3u8",
        ]
    );
    assert_eq!(master.content_type, "application/x-mpegURL");
    assert_eq!(master.cache_control.as_deref(), Some("public, max-age=60"));

    let segment = harness.storage.get("videos/abc123/720p/segment0.ts").unwrap();
    assert_eq!(segment.content_type, "video/MP2T");
    assert_eq!(
        segment.cache_control.as_deref(),
        Some("public, max-age=31536000, immutable")
    );

    let log = harness.storage.put_log();
    assert_eq!(log.last().map(String::as_str), Some("videos/abc123/master.m3u8"));
    assert_eq!(harness.encoder.transcodes(), 5);
}

#[tokio::test]
async fn test_failed_rendition_fails_job_without_master() {
    let encoder = FakeEncoder::hd()
        .failing("480p")
        .with_delay(Duration::from_millis(500));
    let harness = Harness::new(encoder);
    let id = harness.submit("def456", "Broken");

    harness.scheduler.run_once().await.unwrap();

    let record = harness.service.get_status(&id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.published.is_none());
    let message = record.error_message.unwrap();
    assert!(message.contains("decode failed"), "got: {}", message);
    assert!(message.contains("480p"));

    assert!(!harness.storage.contains(&keys::master_key(&id)));
    assert!(!harness
        .storage
        .put_log()
        .iter()
        .any(|key| key.ends_with("master.m3u8")));
    assert_eq!(harness.encoder.cancelled(), 4);
}

#[tokio::test]
async fn test_workspace_removed_after_each_outcome() {
    let ready = Harness::new(FakeEncoder::hd());
    let id = ready.submit("abc123", "Demo");
    ready.scheduler.run_once().await.unwrap();
    assert_eq!(ready.service.get_status(&id).unwrap().status, JobStatus::Ready);
    assert!(!ready.workspace_path(&id).exists());

    let failed = Harness::new(FakeEncoder::hd().failing("240p"));
    let id = failed.submit("def456", "Broken");
    failed.scheduler.run_once().await.unwrap();
    assert_eq!(failed.service.get_status(&id).unwrap().status, JobStatus::Error);
    assert!(!failed.workspace_path(&id).exists());
}

#[tokio::test]
async fn test_one_firing_processes_pending_jobs_sequentially() {
    let harness = Harness::new(FakeEncoder::hd().with_delay(Duration::from_millis(20)));
    let first = harness.submit("job-one", "First");
    let second = harness.submit("job-two", "Second");

    let report = harness.scheduler.run_once().await.unwrap();
    assert_eq!(report.processed, 2);

    for id in [&first, &second] {
        assert_eq!(harness.service.get_status(id).unwrap().status, JobStatus::Ready);
    }
    assert_eq!(harness.encoder.transcodes(), 10);
    assert_eq!(harness.encoder.max_parallel_sources(), 1);
}

#[tokio::test]
async fn test_terminal_jobs_are_not_picked_up_again() {
    let harness = Harness::new(FakeEncoder::hd());
    harness.submit("abc123", "Demo");

    harness.scheduler.run_once().await.unwrap();
    let again = harness.scheduler.run_once().await.unwrap();

    assert_eq!(again.processed, 0);
    assert_eq!(harness.encoder.transcodes(), 5);
}

#[tokio::test]
async fn test_overlapping_firing_is_skipped() {
    let harness = Harness::new(FakeEncoder::hd().with_delay(Duration::from_millis(100)));
    harness.submit("abc123", "Demo");

    let (first, second) = tokio::join!(harness.scheduler.run_once(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        harness.scheduler.run_once().await
    });

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.processed, 1);
    assert!(second.skipped);
    assert_eq!(second.processed, 0);
}

#[tokio::test]
async fn test_scan_error_aborts_only_that_firing() {
    let harness = Harness::with_registry(FakeEncoder::hd(), FlakyRegistry::default());
    let id = harness.submit("abc123", "Demo");

    harness.registry.set_failing(true);
    assert!(harness.scheduler.run_once().await.is_err());
    assert_eq!(
        harness.registry.get(&id).unwrap().unwrap().status,
        JobStatus::Pending
    );

    harness.registry.set_failing(false);
    let report = harness.scheduler.run_once().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(harness.service.get_status(&id).unwrap().status, JobStatus::Ready);
}

fn assert_failed_before_encoding<R: JobRegistry + 'static>(
    harness: &Harness<R>,
    id: &JobId,
    expected: &str,
) {
    let record = harness.service.get_status(id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.published.is_none());
    let message = record.error_message.unwrap();
    assert!(message.contains(expected), "got: {}", message);

    assert_eq!(harness.encoder.transcodes(), 0);
    assert!(!harness.storage.contains(&keys::master_key(id)));
    assert!(!harness.workspace_path(id).exists());
}

#[tokio::test]
async fn test_probe_failure_marks_job_error() {
    let harness = Harness::new(FakeEncoder::hd().failing_probe());
    let id = harness.submit("abc123", "Demo");

    harness.scheduler.run_once().await.unwrap();

    assert_failed_before_encoding(&harness, &id, "moov atom not found");
    assert!(!harness.storage.contains(&keys::thumbnail_key(&id)));
}

#[tokio::test]
async fn test_thumbnail_failure_marks_job_error() {
    let harness = Harness::new(FakeEncoder::hd().failing_thumbnail());
    let id = harness.submit("abc123", "Demo");

    harness.scheduler.run_once().await.unwrap();

    assert_failed_before_encoding(&harness, &id, "Thumbnail failed");
    assert!(!harness.storage.contains(&keys::thumbnail_key(&id)));
}

#[tokio::test]
async fn test_source_without_frame_size_marks_job_error() {
    let encoder = FakeEncoder::new(VideoMetadata {
        duration: 4.0,
        width: 0,
        height: 0,
    });
    let harness = Harness::new(encoder);
    let id = harness.submit("abc123", "Demo");

    harness.scheduler.run_once().await.unwrap();

    assert_failed_before_encoding(&harness, &id, "no frame size");
}

#[tokio::test]
async fn test_unknown_duration_still_packages() {
    let encoder = FakeEncoder::new(VideoMetadata {
        duration: 0.0,
        width: 1280,
        height: 720,
    });
    let harness = Harness::new(encoder);
    let id = harness.submit("abc123", "Recorded");

    harness.scheduler.run_once().await.unwrap();

    let record = harness.service.get_status(&id).unwrap();
    assert_eq!(record.status, JobStatus::Ready);
    assert_eq!(record.published.unwrap().metadata.duration, 0.0);
}

#[tokio::test]
async fn test_final_status_write_failure_aborts_firing() {
    let harness = Harness::with_registry(FakeEncoder::hd(), FlakyRegistry::default());
    let first = harness.submit("job-one", "First");
    let second = harness.submit("job-two", "Second");
    harness.registry.set_failing_terminal_writes(true);

    assert!(harness.scheduler.run_once().await.is_err());
    assert_eq!(
        harness.registry.get(&first).unwrap().unwrap().status,
        JobStatus::Processing
    );
    assert_eq!(
        harness.registry.get(&second).unwrap().unwrap().status,
        JobStatus::Pending
    );
    assert_eq!(harness.encoder.transcodes(), 5);

    harness.registry.set_failing_terminal_writes(false);
    let report = harness.scheduler.run_once().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(harness.service.get_status(&second).unwrap().status, JobStatus::Ready);
}

#[tokio::test]
async fn test_missing_source_marks_job_error() {
    let harness = Harness::new(FakeEncoder::hd());
    let id = harness.submit_without_source("lost01");

    harness.scheduler.run_once().await.unwrap();

    let record = harness.service.get_status(&id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(record.error_message.is_some());
    assert_eq!(harness.encoder.transcodes(), 0);
    assert!(!harness.workspace_path(&id).exists());
}

#[tokio::test]
async fn test_original_deleted_only_after_success() {
    let ready = Harness::new(FakeEncoder::hd());
    let id = ready.submit("abc123", "Demo");
    ready.scheduler.run_once().await.unwrap();
    assert!(!ready.storage.contains(&keys::source_key(&id, "mp4")));

    let failed = Harness::new(FakeEncoder::hd().failing("1080p"));
    let id = failed.submit("def456", "Broken");
    failed.scheduler.run_once().await.unwrap();
    assert!(failed.storage.contains(&keys::source_key(&id, "mp4")));
}

#[tokio::test]
async fn test_upload_failure_marks_job_error() {
    let harness = Harness::new(FakeEncoder::hd());
    let id = harness.submit("abc123", "Demo");
    harness.storage.fail_keys_containing("360p/segment");

    harness.scheduler.run_once().await.unwrap();

    let record = harness.service.get_status(&id).unwrap();
    assert_eq!(record.status, JobStatus::Error);
    assert!(!harness.storage.contains(&keys::master_key(&id)));
}

#[tokio::test]
async fn test_started_loop_drives_jobs_and_stops() {
    let harness = Harness::new(FakeEncoder::hd());
    let id = harness.submit("abc123", "Demo");

    assert!(harness.scheduler.start());
    assert!(!harness.scheduler.start());
    assert!(harness.scheduler.is_running());

    let mut status = JobStatus::Pending;
    for _ in 0..100 {
        status = harness.service.get_status(&id).unwrap().status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, JobStatus::Ready);

    harness.scheduler.shutdown().await;
    assert!(!harness.scheduler.is_running());
}

#[tokio::test]
async fn test_stop_before_first_tick_processes_nothing() {
    let harness = Harness::new(FakeEncoder::hd());
    let id: JobId = harness.submit("abc123", "Demo");

    harness.scheduler.start();
    harness.scheduler.stop();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(harness.service.get_status(&id).unwrap().status, JobStatus::Pending);
    assert!(!harness.scheduler.is_running());
}

//! Streamforge server binary: HTTP API plus the in-process worker loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use streamforge_api::{create_router, metrics, ApiConfig, AppState};
use streamforge_media::FfmpegEncoder;
use streamforge_storage::StorageConfig;
use streamforge_worker::{InMemoryJobRegistry, JobRegistry, JobService, Scheduler, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    info!("Starting streamforge-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(
        "API config: host={}, port={}, max_file_size={}",
        config.host, config.port, config.max_file_size
    );

    FfmpegEncoder::check_available().context("ffmpeg and ffprobe must be on PATH")?;
    tokio::fs::create_dir_all(&worker_config.work_dir)
        .await
        .with_context(|| format!("cannot create {}", worker_config.work_dir.display()))?;

    let storage_config = StorageConfig::from_env().context("invalid storage configuration")?;
    info!("Storage backend: {:?}", storage_config.backend());
    let storage = storage_config.connect().await;

    let registry: Arc<dyn JobRegistry> = Arc::new(InMemoryJobRegistry::new());
    let encoder = Arc::new(FfmpegEncoder::new(worker_config.encoder_timeout_secs));

    let service = JobService::new(
        Arc::clone(&registry),
        Arc::clone(&storage),
        worker_config.ladder.clone(),
    );
    let scheduler = Scheduler::new(registry, Arc::clone(&storage), encoder, &worker_config);

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let state = AppState::new(
        config.clone(),
        service,
        storage,
        worker_config.cache_policy.clone(),
    );
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    scheduler.start();
    info!("Listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.shutdown().await;
    served.context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// JSON output when `LOG_FORMAT=json`, ANSI text otherwise.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("streamforge=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

//! Upload, status and listing handlers.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use streamforge_models::{keys, JobId, JobRecord, JobStatus};
use streamforge_storage::UploadItem;
use streamforge_worker::ExpectedUrls;

use crate::config::extension_for_mime;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const VIDEO_FIELD: &str = "video";

/// Response for an accepted upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub id: String,
    pub status: JobStatus,
    pub expected_urls: ExpectedUrls,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One job in the listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub expected: ExpectedUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VideoEntry {
    fn new(id: &JobId, record: &JobRecord, expected: ExpectedUrls) -> Self {
        let published = record.published.as_ref();
        Self {
            id: id.to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            timestamp: record.created_at,
            expected,
            url: published.map(|p| p.result_url.clone()),
            thumbnail_url: published.map(|p| p.thumbnail_url.clone()),
            duration: published.map(|p| p.metadata.duration),
            width: published.map(|p| p.metadata.width),
            height: published.map(|p| p.metadata.height),
            error: record.error_message.clone(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct GroupedVideos {
    pub ready: Vec<VideoEntry>,
    pub processing: Vec<VideoEntry>,
    pub pending: Vec<VideoEntry>,
    pub error: Vec<VideoEntry>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: usize,
    pub videos: GroupedVideos,
}

struct UploadedFile {
    mime: String,
    file_name: Option<String>,
    data: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    title: String,
    description: String,
}

/// `POST /api/videos/upload`
pub async fn upload_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let multipart = multipart.map_err(|_| ApiError::NoFile)?;
    let form = read_form(&state, multipart).await?;
    let file = form.file.ok_or(ApiError::NoFile)?;

    let id = JobId::new();
    let extension = extension_for_mime(&file.mime, file.file_name.as_deref());
    let source_key = keys::source_key(&id, &extension);
    let size = file.data.len();

    let item = UploadItem::bytes(source_key.clone(), file.data)
        .with_content_type(file.mime.clone())
        .with_cache_control(state.cache_policy.for_key(&source_key).to_string());
    state.storage.upload(item).await?;

    let record = match state
        .service
        .enqueue(&id, &form.title, &form.description, &source_key)
    {
        Ok(record) => record,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete(&source_key).await {
                warn!(key = %source_key, error = %cleanup, "Failed to remove orphaned original");
            }
            return Err(ApiError::UploadFailed(e.to_string()));
        }
    };

    metrics::record_upload(&file.mime, size);
    info!(job_id = %id, bytes = size, mime = %file.mime, "Video uploaded");

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            id: id.to_string(),
            status: record.status,
            expected_urls: state.service.expected_urls(&id),
        }),
    ))
}

async fn read_form(state: &AppState, mut multipart: Multipart) -> ApiResult<UploadForm> {
    let limit = state.config.max_file_size;
    let field_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::TooLarge(limit)
        } else {
            ApiError::invalid_file(e.body_text())
        }
    };

    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            VIDEO_FIELD => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !state.config.allowed_video_types.permits(&mime) {
                    return Err(ApiError::invalid_file(
                        "Invalid file type. Only supported video formats are allowed.",
                    ));
                }
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(field_error)?;
                if data.len() > limit {
                    return Err(ApiError::TooLarge(limit));
                }
                if !data.is_empty() {
                    form.file = Some(UploadedFile {
                        mime,
                        file_name,
                        data: data.to_vec(),
                    });
                }
            }
            "title" => form.title = field.text().await.map_err(field_error)?,
            "description" => form.description = field.text().await.map_err(field_error)?,
            _ => {}
        }
    }

    Ok(form)
}

/// `GET /api/videos/:id/status`
pub async fn get_video_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = JobId::from_string(id);
    let record = state.service.get_status(&id)?;

    Ok(Json(StatusResponse {
        id: id.to_string(),
        status: record.status,
        url: record.result_url().map(str::to_string),
        thumbnail_url: record.thumbnail_url().map(str::to_string),
        error: record.error_message,
    }))
}

/// `GET /api/videos/list`
pub async fn list_videos(State(state): State<AppState>) -> ApiResult<Json<ListResponse>> {
    let listing = state.service.list_all()?;
    let entries = |jobs: &[(JobId, JobRecord)]| -> Vec<VideoEntry> {
        jobs.iter()
            .map(|(id, record)| VideoEntry::new(id, record, state.service.expected_urls(id)))
            .collect()
    };

    Ok(Json(ListResponse {
        total: listing.total(),
        videos: GroupedVideos {
            ready: entries(&listing.ready),
            processing: entries(&listing.processing),
            pending: entries(&listing.pending),
            error: entries(&listing.error),
        },
    }))
}

//! Generation handlers.
//!
//! Async kinds go through the tracker so the accepted task is recorded as
//! `processing`. Sync kinds return the provider response untouched.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use vgen_provider::{
    FileRetrieveResponse, ImageRequest, ImageToVideoRequest, SpeechRequest, StartEndVideoRequest,
    TaskAccepted, TemplateRequest, TextToVideoRequest, VoiceCloneRequest,
};
use vgen_tracker::JobTags;

use crate::error::{ApiError, ApiResult};
use crate::security::{
    check_text_length, require_id, validate_request, MAX_ASYNC_SPEECH_CHARS, MAX_SYNC_SPEECH_CHARS,
};
use crate::state::AppState;

/// Purpose sent with uploads that don't name one.
const DEFAULT_UPLOAD_PURPOSE: &str = "voice_clone";

/// A request body carrying optional job tags next to its own fields.
#[derive(Debug, Deserialize)]
pub struct Tagged<T> {
    #[serde(flatten)]
    pub request: T,
    #[serde(flatten)]
    pub tags: JobTags,
}

/// Unwrap a JSON body, answering malformed input with the 2013 envelope.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::invalid_params(rejection.body_text()))
}

// =============================================================================
// Video (async, tracked)
// =============================================================================

pub async fn generate_text_video(
    State(state): State<AppState>,
    payload: Result<Json<Tagged<TextToVideoRequest>>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Tagged { request, tags } = json_body(payload)?;
    validate_request(&request)?;

    let accepted = state.tracker.submit_text_to_video(&request, tags).await?;
    Ok(Json(accepted))
}

pub async fn generate_image_video(
    State(state): State<AppState>,
    payload: Result<Json<Tagged<ImageToVideoRequest>>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Tagged { request, tags } = json_body(payload)?;
    validate_request(&request)?;

    let accepted = state.tracker.submit_image_to_video(&request, tags).await?;
    Ok(Json(accepted))
}

pub async fn generate_start_end_video(
    State(state): State<AppState>,
    payload: Result<Json<Tagged<StartEndVideoRequest>>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Tagged { request, tags } = json_body(payload)?;
    validate_request(&request)?;

    let accepted = state.tracker.submit_start_end_video(&request, tags).await?;
    Ok(Json(accepted))
}

pub async fn video_template(
    State(state): State<AppState>,
    payload: Result<Json<Tagged<TemplateRequest>>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Tagged { request, tags } = json_body(payload)?;
    validate_request(&request)?;

    let accepted = state.tracker.submit_video_template(&request, tags).await?;
    Ok(Json(accepted))
}

#[derive(Debug, Deserialize)]
pub struct TemplateStatusQuery {
    pub task_id: Option<String>,
}

pub async fn video_template_status(
    State(state): State<AppState>,
    Query(query): Query<TemplateStatusQuery>,
) -> ApiResult<Json<Value>> {
    let task_id = require_id(query.task_id.as_deref(), "task_id")?;
    let status = state.tracker.provider().template_status(&task_id).await?;
    Ok(Json(status))
}

// =============================================================================
// Image and speech
// =============================================================================

pub async fn generate_image(
    State(state): State<AppState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    validate_request(&request)?;

    let result = state.tracker.provider().text_to_image(&request).await?;
    Ok(Json(result))
}

pub async fn t2a_v2(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    validate_request(&request)?;
    check_text_length(
        &request.text,
        MAX_SYNC_SPEECH_CHARS,
        "Text too long for sync mode (max 10K chars)",
    )?;

    let result = state.tracker.provider().speech(&request).await?;
    Ok(Json(result))
}

pub async fn t2a_async_v2(
    State(state): State<AppState>,
    payload: Result<Json<Tagged<SpeechRequest>>, JsonRejection>,
) -> ApiResult<Json<TaskAccepted>> {
    let Tagged { request, tags } = json_body(payload)?;
    validate_request(&request)?;
    check_text_length(&request.text, MAX_ASYNC_SPEECH_CHARS, "Text too long (max 1M chars)")?;

    let accepted = state.tracker.submit_speech_async(&request, tags).await?;
    Ok(Json(accepted))
}

// =============================================================================
// Files and voice cloning
// =============================================================================

pub async fn voice_clone(
    State(state): State<AppState>,
    payload: Result<Json<VoiceCloneRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;
    validate_request(&request)?;

    let result = state.tracker.provider().voice_clone(&request).await?;
    Ok(Json(result))
}

/// Multipart upload with a `file` part and an optional `purpose` field.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Value>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut purpose = DEFAULT_UPLOAD_PURPOSE.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_params(e.body_text()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid_params(e.body_text()))?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("purpose") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::invalid_params(e.body_text()))?;
                if !text.trim().is_empty() {
                    purpose = text.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let Some((filename, bytes)) = file.filter(|(_, bytes)| !bytes.is_empty()) else {
        return Err(ApiError::invalid_params("file is required"));
    };

    info!(filename = %filename, purpose = %purpose, size = bytes.len(), "Uploading file");
    let result = state
        .tracker
        .provider()
        .upload_file(&purpose, &filename, bytes)
        .await?;
    Ok(Json(result))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<FileRetrieveResponse>> {
    let file_id = require_id(Some(&file_id), "file_id")?;
    let file = state.tracker.provider().retrieve_file(&file_id).await?;
    Ok(Json(file))
}

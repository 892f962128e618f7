//! Job status, provider callbacks and composition.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use vgen_models::{CallbackPayload, JobId, JobLookup};
use vgen_tracker::{CallbackOutcome, ComposeRequest, ComposeResult};

use crate::error::ApiResult;
use crate::handlers::generate::json_body;
use crate::state::AppState;

/// Best-known job status, or the pending sentinel for unseen ids.
pub async fn job_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Json<JobLookup> {
    Json(state.tracker.status(&JobId::from_string(task_id)).await)
}

/// Provider completion webhook.
///
/// Malformed and invalid payloads are acknowledged with 200 so the
/// provider does not redeliver them.
pub async fn hailuo_callback(
    State(state): State<AppState>,
    payload: Result<Json<CallbackPayload>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Unreadable callback body");
            return Ok(Json(json!({
                "status": "error",
                "error": rejection.body_text(),
            })));
        }
    };

    let body = match state.tracker.handle_callback(payload).await? {
        CallbackOutcome::Challenge(challenge) => json!({ "challenge": challenge }),
        CallbackOutcome::Applied(_) | CallbackOutcome::Ignored => json!({ "status": "ok" }),
        CallbackOutcome::Invalid(error) => json!({ "status": "error", "error": error }),
    };
    Ok(Json(body))
}

/// Join clips (and an optional soundtrack) into one served short.
pub async fn compose(
    State(state): State<AppState>,
    payload: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult<Json<ComposeResult>> {
    let request = json_body(payload)?;
    let result = state.composer.compose(&request).await?;
    Ok(Json(result))
}

//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use vgen_provider::ProviderError;
use vgen_tracker::TrackerError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Provider-style status code for missing or malformed parameters.
pub const CODE_INVALID_PARAMS: i64 = 2013;
/// Provider-style status code for oversized text.
pub const CODE_TEXT_TOO_LONG: i64 = 2014;
/// Provider-style status code for internal failures.
pub const CODE_INTERNAL: i64 = 1000;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation; answered with a provider-style envelope
    #[error("{message}")]
    Validation {
        message: String,
        code: i64,
        status_msg: String,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl ApiError {
    /// Missing or malformed parameters (code 2013).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            status_msg: message.clone(),
            message,
            code: CODE_INVALID_PARAMS,
        }
    }

    /// Text over the allowed length (code 2014).
    pub fn text_too_long(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: CODE_TEXT_TOO_LONG,
            status_msg: "Text too long".to_string(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Tracker(TrackerError::Provider(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Tracker(TrackerError::InvalidRequest(_)) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Tracker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code().is_server_error() && self.status_code() != StatusCode::BAD_GATEWAY
    }
}

#[derive(Serialize)]
struct BaseRespBody {
    status_code: i64,
    status_msg: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_resp: Option<BaseRespBody>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        }

        let base_resp = match &self {
            ApiError::Validation {
                code, status_msg, ..
            } => Some(BaseRespBody {
                status_code: *code,
                status_msg: status_msg.clone(),
            }),
            ApiError::Tracker(TrackerError::InvalidRequest(msg)) => Some(BaseRespBody {
                status_code: CODE_INVALID_PARAMS,
                status_msg: msg.clone(),
            }),
            _ if status.is_server_error() => Some(BaseRespBody {
                status_code: CODE_INTERNAL,
                status_msg: if status == StatusCode::BAD_GATEWAY {
                    "Upstream error".to_string()
                } else {
                    "Internal error".to_string()
                },
            }),
            _ => None,
        };

        // Don't expose internal error details in production
        let error = if self.is_internal()
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            match &self {
                ApiError::Tracker(TrackerError::InvalidRequest(msg)) => msg.clone(),
                other => other.to_string(),
            }
        };

        (status, Json(ErrorResponse { error, base_resp })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_params_envelope() {
        let response = ApiError::invalid_params("prompt is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "prompt is required");
        assert_eq!(body["base_resp"]["status_code"], 2013);
        assert_eq!(body["base_resp"]["status_msg"], "prompt is required");
    }

    #[tokio::test]
    async fn test_text_too_long_envelope() {
        let body = body_json(ApiError::text_too_long("Text too long (max 1M chars)").into_response()).await;
        assert_eq!(body["base_resp"]["status_code"], 2014);
        assert_eq!(body["base_resp"]["status_msg"], "Text too long");
    }

    #[tokio::test]
    async fn test_provider_errors_are_bad_gateway() {
        let err = ApiError::Provider(ProviderError::from_http_status(500, "down"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["base_resp"]["status_code"], 1000);
    }

    #[test]
    fn test_tracker_status_mapping() {
        let upstream = ApiError::Tracker(TrackerError::Provider(ProviderError::config("x")));
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let invalid = ApiError::Tracker(TrackerError::invalid_request("clips array is required"));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let store = ApiError::Tracker(TrackerError::StoreUnavailable("T1".into()));
        assert_eq!(store.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

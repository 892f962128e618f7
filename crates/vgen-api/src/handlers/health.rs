//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Version reported by `/healthz`.
pub const SERVICE_VERSION: &str = "2.0.0";

/// Liveness body for `/healthz`.
#[derive(Serialize)]
pub struct HealthzResponse {
    pub ok: bool,
    pub time: String,
    /// Seconds since the process started serving
    pub uptime: f64,
    pub version: &'static str,
}

pub async fn healthz(State(state): State<AppState>) -> Json<HealthzResponse> {
    Json(HealthzResponse {
        ok: true,
        time: Utc::now().to_rfc3339(),
        uptime: state.uptime_secs(),
        version: SERVICE_VERSION,
    })
}

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    /// One entry per configured store tier, in read order
    pub checks: Vec<TierCheck>,
}

#[derive(Serialize)]
pub struct TierCheck {
    pub tier: &'static str,
    #[serde(flatten)]
    pub check: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(latency_ms: u64) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(latency_ms),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }
}

/// Readiness check endpoint (readiness probe).
/// Pings every configured store tier.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let start = Instant::now();
    let results = state.tracker.chain().ping_all().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let checks: Vec<TierCheck> = results
        .into_iter()
        .map(|(tier, result)| TierCheck {
            tier: tier.as_str(),
            check: match result {
                Ok(()) => CheckStatus::ok(latency_ms),
                Err(e) => CheckStatus::error(e.to_string()),
            },
        })
        .collect();

    let all_ok = checks.iter().all(|c| c.check.status == "ok");

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks,
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

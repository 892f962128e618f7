//! API routes.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::{
    compose, demo_i2v, demo_start_end, demo_t2i, demo_t2v, generate_image, generate_image_video,
    generate_start_end_video, generate_text_video, get_file, hailuo_callback, health, healthz,
    job_status, ready, t2a_async_v2, t2a_v2, upload, video_template, video_template_status,
    voice_clone,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_limiter = Arc::new(RateLimiterCache::per_minute(
        state.config.rate_limit_per_minute,
        "Too many requests, please try again later.",
    ));
    let demo_limiter = Arc::new(RateLimiterCache::per_minute(
        state.config.demo_rate_limit_per_minute,
        "Too many demo requests, please wait a moment.",
    ));

    // Provider round-trips; composition and polling are left unbounded
    let generation_routes = Router::new()
        .route("/generate-text-video", post(generate_text_video))
        .route("/generate-image-video", post(generate_image_video))
        .route("/generate-start-end-video", post(generate_start_end_video))
        .route("/generate-image", post(generate_image))
        .route("/video-template", post(video_template))
        .route("/video-template/status", get(video_template_status))
        .route("/t2a_v2", post(t2a_v2))
        .route("/t2a_async_v2", post(t2a_async_v2))
        .route("/voice-clone", post(voice_clone))
        .route("/upload", post(upload))
        .route("/file/:file_id", get(get_file))
        .layer(TimeoutLayer::new(state.config.request_timeout));

    let api_routes = Router::new()
        .merge(generation_routes)
        .route("/job/:task_id", get(job_status))
        .route("/compose", post(compose))
        .layer(middleware::from_fn_with_state(api_limiter, rate_limit_middleware));

    let demo_routes = Router::new()
        .route("/t2i", get(demo_t2i))
        .route("/t2v", get(demo_t2v))
        .route("/i2v", get(demo_i2v))
        .route("/start-end", get(demo_start_end))
        .layer(middleware::from_fn_with_state(demo_limiter, rate_limit_middleware));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let layout = state.tracker.layout();
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .nest("/api", api_routes)
        .nest("/demo", demo_routes)
        .route("/hailuo/callback", post(hailuo_callback))
        .merge(health_routes)
        .merge(metrics_routes)
        .nest_service("/out", ServeDir::new(&layout.output_dir))
        .nest_service("/archive", ServeDir::new(&layout.archive_dir))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

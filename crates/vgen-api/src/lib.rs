//! Axum HTTP API server for the generation gateway.
//!
//! This crate provides:
//! - Generation endpoints over the provider client
//! - The provider webhook and job status polling
//! - Clip composition and static serving of finished media
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

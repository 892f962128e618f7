//! MiniMax generation API client.
//!
//! This crate provides:
//! - Async task submission for video, template and speech generation
//! - Sync image, speech, voice clone and file calls
//! - File metadata retrieval for finished artifacts
//! - A single error shape for provider failures

pub mod client;
pub mod error;
pub mod metrics;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{ProviderClient, ProviderConfig};
pub use error::{ProviderError, ProviderResult};
pub use types::{
    AudioSetting, FileInfo, FileRetrieveResponse, ImageToVideoRequest, ImageRequest,
    SpeechRequest, StartEndVideoRequest, TaskAccepted, TemplateRequest, TextToVideoRequest,
    VideoSettings, VoiceCloneRequest, VoiceSetting,
};

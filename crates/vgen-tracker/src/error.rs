//! Tracker error types.

use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Provider error: {0}")]
    Provider(#[from] vgen_provider::ProviderError),

    #[error("Media error: {0}")]
    Media(#[from] vgen_media::MediaError),

    #[error("Artifact unavailable: {0}")]
    Artifact(String),

    #[error("No store tier accepted job {0}")]
    StoreUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::Artifact(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether the failure came from the provider rather than from us.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

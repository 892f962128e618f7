//! Provider client error types.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx response from the provider.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx response whose body could not be parsed.
    #[error("Failed to parse JSON response: {0}")]
    BadResponse(String),

    /// Async submission answered without a task id.
    #[error("Provider rejected task ({status_code}): {status_msg}")]
    Rejected { status_code: i64, status_msg: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build from a failed response, keeping at most a page of body text.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 2000 {
            let cut = (0..=2000).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            body.truncate(cut);
        }
        Self::Http { status, body }
    }

    /// Build from an unparseable body, keeping a short preview.
    pub fn bad_response(body: &str) -> Self {
        let preview: String = body.chars().take(200).collect();
        Self::BadResponse(preview)
    }

    /// HTTP status to report to metrics.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            ProviderError::BadResponse(_) | ProviderError::Rejected { .. } => Some(502),
            ProviderError::Network(e) => e.status().map(|s| s.as_u16()),
            ProviderError::Config(_) => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

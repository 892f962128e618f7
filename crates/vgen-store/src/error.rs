//! Store error types.

use serde::Deserialize;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing a tier.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Error answered by PostgREST, carrying its `code` (a `PGRST*` code
    /// or a Postgres SQLSTATE) when the body had one.
    #[error("PostgREST error ({status}, {code}): {message}")]
    Postgrest {
        status: u16,
        code: String,
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct PostgrestBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StoreError {
    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error from a failed PostgREST response.
    ///
    /// Bodies that are not PostgREST JSON keep their raw text as the message.
    pub fn from_postgrest(status: u16, body: &str, retry_after_ms: Option<u64>) -> Self {
        let parsed: PostgrestBody = serde_json::from_str(body).unwrap_or_default();
        Self::Postgrest {
            status,
            code: parsed.code.unwrap_or_default(),
            message: parsed.message.unwrap_or_else(|| body.trim().to_string()),
            retry_after_ms,
        }
    }

    /// Whether running the same idempotent request again may succeed.
    ///
    /// Transport failures, gateway statuses, PostgREST's own connection
    /// codes and transient SQLSTATEs qualify. Auth, schema and constraint
    /// errors do not.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Network(e) => !e.is_builder() && !e.is_decode(),
            StoreError::Postgrest { status, code, .. } => {
                matches!(status, 429 | 502 | 503 | 504) || is_transient_code(code)
            }
            _ => false,
        }
    }

    /// Delay requested by the server, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            StoreError::Postgrest { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}

/// PGRST000-PGRST003 mean PostgREST could not reach or use the database.
/// SQLSTATE class 08 is a lost connection, 40001/40P01 are serialization
/// and deadlock aborts, 53300 is connection exhaustion and 57P0x is a
/// server shutdown or restart.
fn is_transient_code(code: &str) -> bool {
    matches!(code, "PGRST000" | "PGRST001" | "PGRST002" | "PGRST003")
        || code.starts_with("08")
        || matches!(code, "40001" | "40P01" | "53300")
        || code.starts_with("57P0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_body_is_parsed() {
        let err = StoreError::from_postgrest(
            409,
            r#"{"code":"23505","message":"duplicate key value","details":null,"hint":null}"#,
            None,
        );
        match &err {
            StoreError::Postgrest { status, code, message, .. } => {
                assert_eq!(*status, 409);
                assert_eq!(code, "23505");
                assert_eq!(message, "duplicate key value");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_transient());
    }

    #[test]
    fn test_plain_body_kept_as_message() {
        let err = StoreError::from_postgrest(502, "<html>bad gateway</html>", None);
        assert!(err.to_string().contains("bad gateway"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_transient_codes() {
        let by_code = |status, code: &str| {
            StoreError::from_postgrest(status, &format!(r#"{{"code":"{code}","message":"x"}}"#), None)
        };
        assert!(by_code(503, "PGRST001").is_transient());
        assert!(by_code(500, "40001").is_transient());
        assert!(by_code(500, "40P01").is_transient());
        assert!(by_code(500, "08006").is_transient());
        assert!(by_code(500, "57P01").is_transient());

        assert!(!by_code(401, "PGRST301").is_transient());
        assert!(!by_code(400, "PGRST204").is_transient());
        assert!(!by_code(500, "42P01").is_transient());
    }

    #[test]
    fn test_rate_limit_keeps_retry_after() {
        let err = StoreError::from_postgrest(429, "", Some(1500));
        assert!(err.is_transient());
        assert_eq!(err.retry_after_ms(), Some(1500));
        assert!(!StoreError::request_failed("x").is_transient());
    }
}

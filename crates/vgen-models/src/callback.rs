//! Provider webhook payloads.

use serde::{Deserialize, Deserializer, Serialize};

use crate::job_status::UnknownStatus;
use crate::{JobId, JobStatus};

/// Provider status envelope, present on most responses and callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BaseResp {
    pub fn is_ok(&self) -> bool {
        self.status_code.unwrap_or(0) == 0
    }
}

/// Raw callback body as posted by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackPayload {
    #[serde(default)]
    pub challenge: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub base_resp: Option<BaseResp>,
}

/// Validation failure for a callback body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error("callback is missing task_id")]
    MissingTaskId,

    #[error("callback is missing status")]
    MissingStatus,

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}

/// Validated completion notice for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionNotice {
    pub task_id: JobId,
    pub status: JobStatus,
    pub file_id: Option<String>,
    pub error: Option<String>,
}

/// A classified callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
    /// Endpoint verification, echoed back untouched
    Challenge(serde_json::Value),
    Completion(CompletionNotice),
}

impl CallbackPayload {
    /// Classify and validate the payload.
    pub fn classify(self) -> Result<Callback, CallbackError> {
        if let Some(challenge) = self.challenge {
            return Ok(Callback::Challenge(challenge));
        }

        let task_id = self
            .task_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(CallbackError::MissingTaskId)?;
        let status: JobStatus = self
            .status
            .as_deref()
            .ok_or(CallbackError::MissingStatus)?
            .parse()?;

        let base = self.base_resp.unwrap_or_default();
        let error = match (base.error, status) {
            (Some(err), _) => Some(err),
            (None, JobStatus::Failed) => base.status_msg.filter(|m| !m.is_empty()),
            (None, _) => None,
        };

        Ok(Callback::Completion(CompletionNotice {
            task_id: JobId(task_id),
            status,
            file_id: self.file_id,
            error,
        }))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

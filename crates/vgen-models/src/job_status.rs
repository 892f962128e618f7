//! Job lifecycle status and the lookup result handed to pollers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::JobRecord;

/// Message returned when no tier knows the job.
pub const PENDING_MESSAGE: &str = "Job not found or not yet started";

/// Job processing status.
///
/// `pending` is never stored. It only appears in [`JobLookup::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Provider accepted the task, no completion seen yet
    #[default]
    Processing,
    /// Provider reported success
    Success,
    /// Provider reported failure, or the artifact could not be fetched
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unrecognised status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "success" => Ok(JobStatus::Success),
            "failed" | "fail" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Body returned for ids no tier has seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    pub status: String,
    pub message: String,
}

impl Default for PendingJob {
    fn default() -> Self {
        Self {
            status: "pending".to_string(),
            message: PENDING_MESSAGE.to_string(),
        }
    }
}

/// Result of a status query across the store tiers.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JobLookup {
    Found(Box<JobRecord>),
    Pending(PendingJob),
}

impl JobLookup {
    pub fn pending() -> Self {
        JobLookup::Pending(PendingJob::default())
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, JobLookup::Pending(_))
    }

    pub fn record(&self) -> Option<&JobRecord> {
        match self {
            JobLookup::Found(record) => Some(record.as_ref()),
            JobLookup::Pending(_) => None,
        }
    }
}

impl From<Option<JobRecord>> for JobLookup {
    fn from(value: Option<JobRecord>) -> Self {
        match value {
            Some(record) => JobLookup::Found(Box::new(record)),
            None => JobLookup::pending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("processing".parse::<JobStatus>().unwrap(), JobStatus::Processing);
        assert_eq!("success".parse::<JobStatus>().unwrap(), JobStatus::Success);
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert!("queued".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&JobStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
    }

    #[test]
    fn test_pending_lookup_shape() {
        let body = serde_json::to_value(JobLookup::pending()).unwrap();
        assert_eq!(body["status"], "pending");
        assert_eq!(body["message"], PENDING_MESSAGE);
    }
}

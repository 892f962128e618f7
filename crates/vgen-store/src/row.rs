//! Raw `tasks` row shared by the persistent tiers.
//!
//! Both tiers read the same columns, so both decode through [`TaskRow`]:
//! an unknown `kind` code becomes `None`, an unknown `status` rejects
//! the row.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use vgen_models::{JobId, JobKind, JobRecord, JobStatus};

use crate::error::StoreError;

/// Column list for `tasks` reads.
pub(crate) const COLUMNS: &str =
    "id,kind,status,prompt,params,file_id,public_url,error,topic,lang,started_at,finished_at";

#[derive(Debug, Clone, sqlx::FromRow, Deserialize)]
pub(crate) struct TaskRow {
    pub id: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub status: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for JobRecord {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status: JobStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::invalid_response(format!("task {}: {}", row.id, e)))?;

        Ok(JobRecord {
            id: JobId(row.id),
            kind: row.kind.as_deref().and_then(JobKind::from_code),
            status,
            prompt: row.prompt,
            params: row.params.filter(|p| !p.is_null()),
            file_id: row.file_id,
            public_url: row.public_url,
            error: row.error,
            topic: row.topic,
            lang: row.lang,
            started_at: row.started_at,
            finished_at: row.finished_at,
        })
    }
}

//! Job records tracked across the store tiers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::JobStatus;

/// Number of characters of speech text kept as the job prompt.
pub const PROMPT_PREVIEW_CHARS: usize = 100;

/// Provider-assigned task identifier.
///
/// Ids are never generated locally; they come back from the provider when
/// a task is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kind of generation request behind a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum JobKind {
    #[serde(rename = "t2v")]
    TextToVideo,
    #[serde(rename = "i2v")]
    ImageToVideo,
    #[serde(rename = "start_end")]
    StartEndVideo,
    #[serde(rename = "video_template")]
    VideoTemplate,
    #[serde(rename = "t2a")]
    SpeechSync,
    #[serde(rename = "t2a_async")]
    SpeechAsync,
}

impl JobKind {
    /// Code stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::TextToVideo => "t2v",
            JobKind::ImageToVideo => "i2v",
            JobKind::StartEndVideo => "start_end",
            JobKind::VideoTemplate => "video_template",
            JobKind::SpeechSync => "t2a",
            JobKind::SpeechAsync => "t2a_async",
        }
    }

    /// Parse a stored kind code. Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "t2v" => Some(JobKind::TextToVideo),
            "i2v" => Some(JobKind::ImageToVideo),
            "start_end" => Some(JobKind::StartEndVideo),
            "video_template" => Some(JobKind::VideoTemplate),
            "t2a" => Some(JobKind::SpeechSync),
            "t2a_async" => Some(JobKind::SpeechAsync),
            _ => None,
        }
    }

    pub fn is_speech(&self) -> bool {
        matches!(self, JobKind::SpeechSync | JobKind::SpeechAsync)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as stored in every tier.
///
/// `None` fields in an incoming write mean "unknown", never "clear".
/// See [`JobRecord::merge`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRecord {
    pub id: JobId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<JobKind>,

    #[serde(default)]
    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Generation parameters, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,

    #[serde(default)]
    pub public_url: Option<String>,

    #[serde(default)]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Empty record carrying only an id and status.
    pub fn new(id: JobId, status: JobStatus) -> Self {
        Self {
            id,
            kind: None,
            status,
            prompt: None,
            params: None,
            file_id: None,
            public_url: None,
            error: None,
            topic: None,
            lang: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Coalesce-merge `incoming` onto `self`.
    ///
    /// Non-null incoming fields overwrite, null incoming fields keep the
    /// stored value. Once the stored record is terminal its status and
    /// `finished_at` are frozen.
    pub fn merge(&self, incoming: &JobRecord) -> JobRecord {
        let frozen = self.is_terminal();

        JobRecord {
            id: self.id.clone(),
            kind: incoming.kind.or(self.kind),
            status: if frozen { self.status } else { incoming.status },
            prompt: incoming.prompt.clone().or_else(|| self.prompt.clone()),
            params: incoming.params.clone().or_else(|| self.params.clone()),
            file_id: incoming.file_id.clone().or_else(|| self.file_id.clone()),
            public_url: incoming.public_url.clone().or_else(|| self.public_url.clone()),
            error: incoming.error.clone().or_else(|| self.error.clone()),
            topic: incoming.topic.clone().or_else(|| self.topic.clone()),
            lang: incoming.lang.clone().or_else(|| self.lang.clone()),
            started_at: incoming.started_at.or(self.started_at),
            finished_at: if frozen {
                self.finished_at
            } else {
                incoming.finished_at.or(self.finished_at)
            },
        }
    }

    /// Check the record-level invariants.
    ///
    /// `finished_at` is set exactly when the status is terminal, and a
    /// public URL only exists on success.
    pub fn is_consistent(&self) -> bool {
        let finished_ok = self.finished_at.is_some() == self.status.is_terminal();
        let url_ok = self.public_url.is_none() || self.status == JobStatus::Success;
        finished_ok && url_ok
    }
}

/// A task the provider just accepted, ready to be recorded as `processing`.
#[derive(Debug, Clone, PartialEq)]
pub struct StartedJob {
    pub id: JobId,
    pub kind: JobKind,
    pub prompt: Option<String>,
    pub params: serde_json::Value,
    pub topic: Option<String>,
    pub lang: Option<String>,
}

impl StartedJob {
    pub fn new(id: JobId, kind: JobKind, params: serde_json::Value) -> Self {
        Self {
            id,
            kind,
            prompt: None,
            params,
            topic: None,
            lang: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.prompt = Some(if self.kind.is_speech() {
            truncate_prompt(&prompt)
        } else {
            prompt
        });
        self
    }

    pub fn with_tags(mut self, topic: Option<String>, lang: Option<String>) -> Self {
        self.topic = topic;
        self.lang = lang;
        self
    }

    /// Build the initial `processing` record.
    pub fn into_record(self, started_at: DateTime<Utc>) -> JobRecord {
        JobRecord {
            kind: Some(self.kind),
            prompt: self.prompt,
            params: Some(self.params),
            topic: self.topic,
            lang: self.lang,
            started_at: Some(started_at),
            ..JobRecord::new(self.id, JobStatus::Processing)
        }
    }
}

/// Keep the first [`PROMPT_PREVIEW_CHARS`] characters, appending `...` when cut.
pub fn truncate_prompt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PROMPT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn started() -> JobRecord {
        StartedJob::new(
            JobId::from("T1"),
            JobKind::TextToVideo,
            json!({"duration": 6, "resolution": "1080P", "aspect_ratio": "16:9"}),
        )
        .with_prompt("a cat")
        .into_record(ts(0))
    }

    #[test]
    fn test_started_record_is_processing() {
        let record = started();
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.kind, Some(JobKind::TextToVideo));
        assert_eq!(record.prompt.as_deref(), Some("a cat"));
        assert!(record.finished_at.is_none());
        assert!(record.is_consistent());
    }

    #[test]
    fn test_merge_keeps_stored_values_for_nulls() {
        let stored = started();
        let mut update = JobRecord::new(JobId::from("T1"), JobStatus::Success);
        update.file_id = Some("F1".into());
        update.public_url = Some("https://x/out/a.mp4".into());
        update.finished_at = Some(ts(10));

        let merged = stored.merge(&update);
        assert_eq!(merged.status, JobStatus::Success);
        assert_eq!(merged.kind, Some(JobKind::TextToVideo));
        assert_eq!(merged.prompt.as_deref(), Some("a cat"));
        assert_eq!(merged.params, stored.params);
        assert_eq!(merged.file_id.as_deref(), Some("F1"));
        assert_eq!(merged.started_at, Some(ts(0)));
        assert!(merged.is_consistent());
    }

    #[test]
    fn test_merge_is_idempotent() {
        let stored = started();
        let mut update = JobRecord::new(JobId::from("T1"), JobStatus::Failed);
        update.error = Some("boom".into());
        update.finished_at = Some(ts(5));

        let once = stored.merge(&update);
        let twice = once.merge(&update);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_terminal_status_is_frozen() {
        let mut done = started();
        done.status = JobStatus::Success;
        done.finished_at = Some(ts(10));
        done.public_url = Some("https://x/out/a.mp4".into());

        let mut late = JobRecord::new(JobId::from("T1"), JobStatus::Failed);
        late.finished_at = Some(ts(20));
        late.error = Some("late".into());

        let merged = done.merge(&late);
        assert_eq!(merged.status, JobStatus::Success);
        assert_eq!(merged.finished_at, Some(ts(10)));
    }

    #[test]
    fn test_truncate_prompt() {
        let long = "a".repeat(150);
        let cut = truncate_prompt(&long);
        assert_eq!(cut.len(), 103);
        assert!(cut.ends_with("..."));

        assert_eq!(truncate_prompt("short"), "short");
    }

    #[test]
    fn test_speech_prompt_is_truncated() {
        let record = StartedJob::new(JobId::from("S1"), JobKind::SpeechAsync, json!({}))
            .with_prompt("x".repeat(250))
            .into_record(ts(0));
        assert_eq!(record.prompt.map(|p| p.chars().count()), Some(103));
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(JobKind::from_code("t2v"), Some(JobKind::TextToVideo));
        assert_eq!(JobKind::ImageToVideo.as_str(), "i2v");
        assert_eq!(serde_json::to_value(JobKind::StartEndVideo).unwrap(), json!("start_end"));
        assert!(JobKind::from_code("nope").is_none());
    }
}

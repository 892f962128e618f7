//! The callback state transition, free of I/O.

use chrono::{DateTime, Utc};

use vgen_models::{CompletionNotice, JobRecord, JobStatus};

/// Prefix of the error recorded when a successful job's artifact could not
/// be fetched or archived.
pub const ARTIFACT_ERROR_PREFIX: &str = "artifact download failed";

/// Result of the artifact step for a `success` notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Artifact is served at this URL
    Stored { public_url: String },
    /// Download or archive failed with this reason
    Failed(String),
}

/// Compute the record that results from applying `notice` to `current`.
///
/// A terminal notice stamps `finished_at = now`. A `success` whose artifact
/// step failed becomes `failed` with the reason in `error` and no public
/// URL. The result is coalesce-merged onto `current`, so a terminal
/// `current` keeps its status and `finished_at`.
pub fn apply_callback(
    current: Option<&JobRecord>,
    notice: &CompletionNotice,
    artifact: Option<&ArtifactOutcome>,
    now: DateTime<Utc>,
) -> JobRecord {
    let mut incoming = JobRecord::new(notice.task_id.clone(), notice.status);
    incoming.file_id = notice.file_id.clone();
    incoming.error = notice.error.clone();

    if notice.status == JobStatus::Success {
        match artifact {
            Some(ArtifactOutcome::Stored { public_url }) => {
                incoming.public_url = Some(public_url.clone());
            }
            Some(ArtifactOutcome::Failed(reason)) => {
                incoming.status = JobStatus::Failed;
                incoming.error = Some(format!("{ARTIFACT_ERROR_PREFIX}: {reason}"));
            }
            None => {}
        }
    }

    if incoming.status.is_terminal() {
        incoming.finished_at = Some(now);
    }

    match current {
        Some(current) => current.merge(&incoming),
        None => incoming,
    }
}

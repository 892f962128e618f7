//! Fetching, storing and archiving finished artifacts.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use vgen_media::{download_to_file, extension_from_url, is_safe_filename, MediaLayout};
use vgen_models::{JobId, JobKind};
use vgen_provider::ProviderClient;

use crate::error::{TrackerError, TrackerResult};

/// A downloaded artifact and where it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub filename: String,
    pub path: PathBuf,
    pub archived: PathBuf,
    pub public_url: String,
}

/// Resolve `file_id`, stream it into the output root, archive a copy and
/// compute its public URL.
#[instrument(skip(provider, layout, task_id, now), fields(task_id = %task_id))]
pub async fn fetch_artifact(
    provider: &ProviderClient,
    layout: &MediaLayout,
    task_id: &JobId,
    kind: Option<JobKind>,
    file_id: &str,
    now: DateTime<Utc>,
) -> TrackerResult<StoredArtifact> {
    let retrieved = provider.retrieve_file(file_id).await?;
    if let Some(base) = retrieved.base_resp.as_ref().filter(|b| !b.is_ok()) {
        return Err(TrackerError::artifact(format!(
            "file {} rejected: {}",
            file_id,
            base.status_msg.as_deref().unwrap_or("unknown error")
        )));
    }

    let file = retrieved.file;
    if file.download_url.trim().is_empty() {
        return Err(TrackerError::artifact(format!("file {file_id} has no download_url")));
    }

    let filename = artifact_filename(&file.filename, &file.download_url, task_id, kind)?;
    let path = layout.output_path(&filename)?;

    let bytes = download_to_file(provider.http(), &file.download_url, &path, layout.download_timeout).await?;
    let archived = layout.archive(&path, now).await?;
    let public_url = layout.public_url(&filename);

    info!(file_id, bytes, public_url = %public_url, "Artifact stored");

    Ok(StoredArtifact {
        filename,
        path,
        archived,
        public_url,
    })
}

/// Local name for an artifact, always scoped by task id since the output
/// root is shared. Keeps the provider filename when it is a plain safe
/// name, else derives one from the download URL's extension.
fn artifact_filename(
    provided: &str,
    download_url: &str,
    task_id: &JobId,
    kind: Option<JobKind>,
) -> TrackerResult<String> {
    let scoped = format!("{}_{}", task_id.as_str(), provided);
    if is_safe_filename(provided) && is_safe_filename(&scoped) {
        return Ok(scoped);
    }

    let default_ext = match kind {
        Some(k) if k.is_speech() => ".mp3",
        _ => ".mp4",
    };
    let derived = format!(
        "hailuo_{}{}",
        task_id.as_str(),
        extension_from_url(download_url, default_ext)
    );

    if is_safe_filename(&derived) {
        Ok(derived)
    } else {
        Err(TrackerError::artifact(format!("no safe filename for task {task_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_filename_is_kept_when_safe() {
        let name = artifact_filename("output.mp4", "https://cdn/x.mp4", &JobId::from("T1"), None).unwrap();
        assert_eq!(name, "T1_output.mp4");
    }

    #[test]
    fn test_same_provider_filename_differs_per_task() {
        let a = artifact_filename("output.mp4", "https://cdn/a.mp4", &JobId::from("A1"), None).unwrap();
        let b = artifact_filename("output.mp4", "https://cdn/b.mp4", &JobId::from("B2"), None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unsafe_filename_is_derived() {
        let name = artifact_filename("../../etc/passwd", "https://cdn/x.mov", &JobId::from("T1"), None).unwrap();
        assert_eq!(name, "hailuo_T1.mov");

        let speech = artifact_filename("", "https://cdn/blob", &JobId::from("T2"), Some(JobKind::SpeechAsync)).unwrap();
        assert_eq!(speech, "hailuo_T2.mp3");
    }

    #[test]
    fn test_unsafe_task_id_is_rejected() {
        assert!(artifact_filename("", "https://cdn/x.mp4", &JobId::from("a/b"), None).is_err());
    }
}

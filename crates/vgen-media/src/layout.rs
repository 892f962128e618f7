//! On-disk layout for served and archived artifacts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::fs_utils::is_safe_filename;

/// URL prefix the output root is served under.
pub const OUTPUT_URL_PREFIX: &str = "/out";

/// Paths and limits shared by downloads, archiving and composition.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    /// Served artifacts, exposed under `/out`
    pub output_dir: PathBuf,
    /// Timestamp-prefixed copies, never pruned
    pub archive_dir: PathBuf,
    pub public_base_url: String,
    pub download_timeout: Duration,
    pub ffmpeg_timeout: Duration,
}

impl MediaLayout {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            archive_dir: archive_dir.into(),
            public_base_url: public_base_url.into(),
            download_timeout: Duration::from_secs(600),
            ffmpeg_timeout: Duration::from_secs(900),
        }
    }

    /// Create layout from environment variables.
    pub fn from_env() -> Self {
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        let mut layout = Self::new(
            std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "out".to_string()),
            std::env::var("ARCHIVE_DIR").unwrap_or_else(|_| "archive".to_string()),
            public_base_url,
        );

        if let Some(secs) = env_secs("DOWNLOAD_TIMEOUT_SECS") {
            layout.download_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs("FFMPEG_TIMEOUT_SECS") {
            layout.ffmpeg_timeout = Duration::from_secs(secs);
        }

        layout
    }

    /// Create the output and archive roots.
    pub async fn ensure_dirs(&self) -> MediaResult<()> {
        fs::create_dir_all(&self.output_dir).await?;
        fs::create_dir_all(&self.archive_dir).await?;
        Ok(())
    }

    /// Path of a served artifact. Rejects anything but a plain filename.
    pub fn output_path(&self, filename: &str) -> MediaResult<PathBuf> {
        if !is_safe_filename(filename) {
            return Err(MediaError::security_violation(format!(
                "unsafe artifact filename: {filename:?}"
            )));
        }
        Ok(self.output_dir.join(filename))
    }

    /// Public URL of a served artifact.
    pub fn public_url(&self, filename: &str) -> String {
        format!(
            "{}{}/{}",
            self.public_base_url.trim_end_matches('/'),
            OUTPUT_URL_PREFIX,
            filename
        )
    }

    /// Copy `path` into the archive as `<timestamp>_<filename>`.
    ///
    /// The original stays where it is.
    pub async fn archive(&self, path: &Path, now: DateTime<Utc>) -> MediaResult<PathBuf> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MediaError::FileNotFound(path.to_path_buf()))?;

        fs::create_dir_all(&self.archive_dir).await?;
        let archived = self
            .archive_dir
            .join(format!("{}_{}", archive_timestamp(now), filename));

        fs::copy(path, &archived).await?;
        info!(archived = %archived.display(), "Artifact archived");
        Ok(archived)
    }

    /// Fresh per-request scratch directory under the output root.
    pub fn scratch_dir(&self) -> PathBuf {
        self.output_dir
            .join("tmp_compose")
            .join(Uuid::new_v4().to_string())
    }
}

/// ISO-8601 millisecond UTC timestamp with `:` and `.` replaced by `-`.
fn archive_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

fn env_secs(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn layout(dir: &Path) -> MediaLayout {
        MediaLayout::new(dir.join("out"), dir.join("archive"), "https://gw.example/")
    }

    #[test]
    fn test_public_url_joins_base() {
        let layout = MediaLayout::new("out", "archive", "https://gw.example/");
        assert_eq!(layout.public_url("a.mp4"), "https://gw.example/out/a.mp4");
    }

    #[test]
    fn test_output_path_rejects_traversal() {
        let layout = MediaLayout::new("out", "archive", "https://gw.example");
        assert_eq!(layout.output_path("a.mp4").unwrap(), Path::new("out/a.mp4"));
        assert!(matches!(
            layout.output_path("../a.mp4"),
            Err(MediaError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_archive_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(archive_timestamp(now), "2025-01-02T03-04-05-000Z");
    }

    #[test]
    fn test_scratch_dirs_are_unique() {
        let layout = MediaLayout::new("out", "archive", "https://gw.example");
        let a = layout.scratch_dir();
        assert!(a.starts_with("out/tmp_compose"));
        assert_ne!(a, layout.scratch_dir());
    }

    #[tokio::test]
    async fn test_archive_copies_and_keeps_original() {
        let dir = TempDir::new().unwrap();
        let layout = layout(dir.path());
        layout.ensure_dirs().await.unwrap();

        let original = layout.output_path("a.mp4").unwrap();
        fs::write(&original, b"video").await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let archived = layout.archive(&original, now).await.unwrap();

        assert!(original.exists());
        assert_eq!(
            archived,
            dir.path().join("archive").join("2025-01-02T03-04-05-000Z_a.mp4")
        );
        assert_eq!(fs::read(&archived).await.unwrap(), b"video");
    }
}

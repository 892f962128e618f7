//! Filesystem helpers for artifact files.
//!
//! Output and archive directories may live on different mounts, so moves
//! fall back to copy-and-delete when a rename crosses devices.

use std::path::Path;
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Longest accepted artifact filename.
const MAX_FILENAME_LEN: usize = 256;

/// Whether `name` is a plain filename that is safe to join onto a media directory.
///
/// Only ASCII alphanumerics plus `-`, `_` and `.` are accepted, with no
/// traversal sequences.
pub fn is_safe_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return false;
    }

    if name == "." || name.contains("..") || name.contains('/') || name.contains('\\') {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Move a file from `src` to `dst`, creating the destination directory.
///
/// Tries a rename first and falls back to copy-and-delete on EXDEV.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if !fs::try_exists(src).await.unwrap_or(false) {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, copying instead: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage next to dst so the final rename stays on one filesystem
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

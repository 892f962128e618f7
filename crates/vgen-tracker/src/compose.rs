//! Composition of finished clips into one served short.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vgen_media::{
    concat_clips, download_to_file, extension_from_url, move_file, FfmpegRunner, MediaLayout,
};

use crate::error::{TrackerError, TrackerResult};
use crate::metrics::record_composition;

/// One clip to include, in order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClipSource {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComposeRequest {
    #[serde(default)]
    pub clips: Vec<ClipSource>,
    /// Optional soundtrack muxed over the joined clips
    #[serde(default)]
    pub audio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposeResult {
    pub status: &'static str,
    /// Path of the composed file relative to the working directory
    pub out: String,
    pub public_url: String,
}

/// Downloads clips into a scratch directory, joins them with FFmpeg and
/// publishes the result under the output root.
pub struct Composer {
    http: reqwest::Client,
    layout: MediaLayout,
    runner: FfmpegRunner,
}

impl Composer {
    pub fn new(http: reqwest::Client, layout: MediaLayout) -> Self {
        let runner = FfmpegRunner::new().with_timeout(layout.ffmpeg_timeout.as_secs());
        Self {
            http,
            layout,
            runner,
        }
    }

    /// Compose `req` into `<output>/short_<millis>.mp4`.
    ///
    /// The final file appears in the output root only once FFmpeg
    /// succeeded. Scratch files stay behind on failure.
    pub async fn compose(&self, req: &ComposeRequest) -> TrackerResult<ComposeResult> {
        if req.clips.is_empty() {
            return Err(TrackerError::invalid_request("clips array is required"));
        }

        let result = self.compose_inner(req).await;
        record_composition(result.is_ok());
        if let Err(e) = &result {
            warn!(error = %e, clips = req.clips.len(), "Composition failed");
        }
        result
    }

    async fn compose_inner(&self, req: &ComposeRequest) -> TrackerResult<ComposeResult> {
        let scratch = self.layout.scratch_dir();
        tokio::fs::create_dir_all(&scratch).await?;

        let mut clips = Vec::with_capacity(req.clips.len());
        for (idx, clip) in req.clips.iter().enumerate() {
            let ext = extension_from_url(&clip.url, ".mp4");
            let path = scratch.join(format!("clip_{}{}", idx + 1, ext));
            self.fetch(&clip.url, &path).await?;
            clips.push(path);
        }

        let audio = match &req.audio {
            Some(url) => {
                let path = scratch.join(format!("audio{}", extension_from_url(url, ".mp3")));
                self.fetch(url, &path).await?;
                Some(path)
            }
            None => None,
        };

        let now = Utc::now();
        let filename = format!("short_{}.mp4", now.timestamp_millis());
        let staged = scratch.join(&filename);

        concat_clips(&self.runner, &clips, audio.as_deref(), &scratch, &staged).await?;

        let out = self.layout.output_path(&filename)?;
        move_file(&staged, &out).await?;
        self.layout.archive(&out, now).await?;

        let public_url = self.layout.public_url(&filename);
        info!(out = %out.display(), public_url = %public_url, "Short composed");

        Ok(ComposeResult {
            status: "ok",
            out: out.to_string_lossy().into_owned(),
            public_url,
        })
    }

    async fn fetch(&self, url: &str, dest: &Path) -> TrackerResult<u64> {
        download_to_file(&self.http, url, dest, self.layout.download_timeout)
            .await
            .map_err(|e| TrackerError::artifact(format!("failed to download {url}: {e}")))
    }
}

//! Clip concatenation and audio muxing.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Write an FFmpeg concat demuxer list for `paths` to `list_path`.
///
/// Entries are absolute so the list resolves regardless of working directory.
pub async fn write_concat_list(paths: &[PathBuf], list_path: &Path) -> MediaResult<()> {
    let mut list = String::new();
    for path in paths {
        let abs = if path.is_absolute() {
            path.clone()
        } else {
            std::env::current_dir()?.join(path)
        };
        // Concat lists quote with single quotes; escape embedded ones
        let escaped = abs.to_string_lossy().replace('\'', "'\\''");
        list.push_str(&format!("file '{}'\n", escaped));
    }
    fs::write(list_path, list).await?;
    Ok(())
}

/// Concatenate `clips` into `output`, optionally muxing `audio` over them.
///
/// Intermediate files go to `scratch`. Without audio the clips are joined
/// with stream copy. With audio the joined video is copied and the audio
/// is encoded to AAC, cut to the shorter of the two.
pub async fn concat_clips(
    runner: &FfmpegRunner,
    clips: &[PathBuf],
    audio: Option<&Path>,
    scratch: &Path,
    output: &Path,
) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(MediaError::ffmpeg_failed("no clips to concatenate", None, None));
    }

    fs::create_dir_all(scratch).await?;
    let list_path = scratch.join("files.txt");
    write_concat_list(clips, &list_path).await?;

    let concat_input = ["-f", "concat", "-safe", "0"];

    match audio {
        None => {
            let cmd = FfmpegCommand::new(output)
                .input_with_args(concat_input, &list_path)
                .stream_copy();
            runner.run(&cmd).await?;
        }
        Some(audio) => {
            let joined = scratch.join("concat.mp4");
            let concat = FfmpegCommand::new(&joined)
                .input_with_args(concat_input, &list_path)
                .stream_copy();
            runner.run(&concat).await?;

            let mux = FfmpegCommand::new(output)
                .input(&joined)
                .input(audio)
                .video_codec("copy")
                .audio_codec("aac")
                .shortest();
            runner.run(&mux).await?;
        }
    }

    info!(clips = clips.len(), with_audio = audio.is_some(), output = %output.display(), "Clips composed");
    Ok(())
}

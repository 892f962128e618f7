//! Media handling for generated artifacts.
//!
//! Downloads provider artifacts into the served output root, archives
//! timestamped copies, and joins clips with FFmpeg.

pub mod command;
pub mod compose;
pub mod download;
pub mod error;
pub mod fs_utils;
pub mod layout;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use compose::{concat_clips, write_concat_list};
pub use download::{download_to_file, extension_from_url};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{is_safe_filename, move_file};
pub use layout::{MediaLayout, OUTPUT_URL_PREFIX};

//! Job lifecycle tracking.
//!
//! This crate provides:
//! - Submission: ask the provider, then record the job as `processing`
//! - Callback handling: validate, fetch the artifact, apply the transition
//! - Status lookups across the store tiers
//! - Clip composition into a single served short

pub mod artifact;
pub mod compose;
pub mod error;
pub mod locks;
pub mod metrics;
pub mod tracker;
pub mod transition;

pub use artifact::StoredArtifact;
pub use compose::{ClipSource, ComposeRequest, ComposeResult, Composer};
pub use error::{TrackerError, TrackerResult};
pub use locks::KeyedLocks;
pub use tracker::{CallbackOutcome, JobTags, JobTracker};
pub use transition::{apply_callback, ArtifactOutcome, ARTIFACT_ERROR_PREFIX};

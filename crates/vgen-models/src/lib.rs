//! Shared data models for the VGen gateway.
//!
//! This crate provides Serde-serializable types for:
//! - Job records tracked across store tiers
//! - Job kinds and lifecycle statuses
//! - Provider completion callbacks
//! - Status lookups returned to pollers

pub mod callback;
pub mod job;
pub mod job_status;

// Re-export common types
pub use callback::{BaseResp, Callback, CallbackError, CallbackPayload, CompletionNotice};
pub use job::{truncate_prompt, JobId, JobKind, JobRecord, StartedJob, PROMPT_PREVIEW_CHARS};
pub use job_status::{JobLookup, JobStatus, PendingJob, UnknownStatus, PENDING_MESSAGE};

//! Tracker metrics.

use metrics::counter;

pub mod names {
    pub const JOBS_STARTED: &str = "vgen_jobs_started_total";
    pub const CALLBACKS: &str = "vgen_callbacks_total";
    pub const ARTIFACTS: &str = "vgen_artifacts_total";
    pub const COMPOSITIONS: &str = "vgen_compositions_total";
}

pub fn record_job_started(kind: &str) {
    counter!(names::JOBS_STARTED, "kind" => kind.to_string()).increment(1);
}

/// `outcome` is one of `challenge`, `applied`, `ignored` or `invalid`.
pub fn record_callback(outcome: &'static str) {
    counter!(names::CALLBACKS, "outcome" => outcome).increment(1);
}

pub fn record_artifact(ok: bool) {
    counter!(names::ARTIFACTS, "outcome" => if ok { "stored" } else { "failed" }).increment(1);
}

pub fn record_composition(ok: bool) {
    counter!(names::COMPOSITIONS, "outcome" => if ok { "ok" } else { "error" }).increment(1);
}

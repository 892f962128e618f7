//! Job lifecycle tracker.
//!
//! Submission is two explicit steps: the provider accepts a task, then the
//! job is recorded as `processing` in every tier. Callbacks move a job to
//! a terminal state exactly once; later deliveries for a terminal job are
//! acknowledged and dropped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use vgen_media::MediaLayout;
use vgen_models::{
    Callback, CallbackPayload, CompletionNotice, JobId, JobKind, JobLookup, JobRecord, JobStatus,
    StartedJob,
};
use vgen_provider::{
    ImageToVideoRequest, ProviderClient, SpeechRequest, StartEndVideoRequest, TaskAccepted,
    TemplateRequest, TextToVideoRequest,
};
use vgen_store::{TierChain, WriteReport};

use crate::artifact::fetch_artifact;
use crate::error::{TrackerError, TrackerResult};
use crate::locks::KeyedLocks;
use crate::metrics::{record_artifact, record_callback, record_job_started};
use crate::transition::{apply_callback, ArtifactOutcome};

/// Optional classification tags stored with a job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobTags {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

/// What the callback endpoint should answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// Endpoint verification; echo the value back
    Challenge(Value),
    /// Transition applied, with the resulting record
    Applied(Box<JobRecord>),
    /// Job was already terminal; nothing written
    Ignored,
    /// Payload failed validation
    Invalid(String),
}

pub struct JobTracker {
    provider: ProviderClient,
    chain: TierChain,
    layout: MediaLayout,
    locks: KeyedLocks,
}

impl JobTracker {
    pub fn new(provider: ProviderClient, chain: TierChain, layout: MediaLayout) -> Self {
        Self {
            provider,
            chain,
            layout,
            locks: KeyedLocks::new(),
        }
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    pub fn chain(&self) -> &TierChain {
        &self.chain
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    // =========================================================================
    // Submission
    // =========================================================================

    pub async fn submit_text_to_video(
        &self,
        req: &TextToVideoRequest,
        tags: JobTags,
    ) -> TrackerResult<TaskAccepted> {
        let accepted = self.provider.text_to_video(req).await?;
        let started = StartedJob::new(id_of(&accepted), JobKind::TextToVideo, req.job_params())
            .with_prompt(req.prompt.as_str())
            .with_tags(tags.topic, tags.lang);
        self.record_started(started).await?;
        Ok(accepted)
    }

    pub async fn submit_image_to_video(
        &self,
        req: &ImageToVideoRequest,
        tags: JobTags,
    ) -> TrackerResult<TaskAccepted> {
        let accepted = self.provider.image_to_video(req).await?;
        let started = StartedJob::new(id_of(&accepted), JobKind::ImageToVideo, req.job_params())
            .with_prompt(req.prompt.as_str())
            .with_tags(tags.topic, tags.lang);
        self.record_started(started).await?;
        Ok(accepted)
    }

    pub async fn submit_start_end_video(
        &self,
        req: &StartEndVideoRequest,
        tags: JobTags,
    ) -> TrackerResult<TaskAccepted> {
        let accepted = self.provider.start_end_video(req).await?;
        let started = StartedJob::new(id_of(&accepted), JobKind::StartEndVideo, req.job_params())
            .with_prompt(req.prompt.as_str())
            .with_tags(tags.topic, tags.lang);
        self.record_started(started).await?;
        Ok(accepted)
    }

    pub async fn submit_video_template(
        &self,
        req: &TemplateRequest,
        tags: JobTags,
    ) -> TrackerResult<TaskAccepted> {
        let accepted = self.provider.video_template(req).await?;
        let started = StartedJob::new(id_of(&accepted), JobKind::VideoTemplate, req.job_params())
            .with_tags(tags.topic, tags.lang);
        self.record_started(started).await?;
        Ok(accepted)
    }

    pub async fn submit_speech_async(
        &self,
        req: &SpeechRequest,
        tags: JobTags,
    ) -> TrackerResult<TaskAccepted> {
        let accepted = self.provider.speech_async(req).await?;
        let started = StartedJob::new(id_of(&accepted), JobKind::SpeechAsync, req.job_params())
            .with_prompt(req.text.as_str())
            .with_tags(tags.topic, tags.lang);
        self.record_started(started).await?;
        Ok(accepted)
    }

    /// Record an accepted task as `processing` in every tier.
    ///
    /// A callback can land before this write. The initial fields are then
    /// merged onto the stored record, so a terminal status stays terminal
    /// even in tiers that overwrite every column they are sent.
    pub async fn record_started(&self, started: StartedJob) -> TrackerResult<JobRecord> {
        let kind = started.kind;
        let initial = started.into_record(Utc::now());

        let _guard = self.locks.lock(initial.id.as_str()).await;
        let record = match self.chain.get_first(&initial.id).await {
            Some((tier, existing)) => {
                debug!(task_id = %initial.id, tier = %tier, stored = %existing.status, "Start merged onto stored job");
                existing.merge(&initial)
            }
            None => initial,
        };
        let report = self.chain.put_all(&record).await;
        self.ensure_written(&record.id, &report)?;

        record_job_started(kind.as_str());
        info!(task_id = %record.id, kind = %kind, "Job started");
        Ok(record)
    }

    // =========================================================================
    // Callbacks
    // =========================================================================

    /// Apply a provider callback.
    ///
    /// Validation failures and duplicate deliveries are answered, never
    /// raised. Errors are reserved for the case where no tier could take
    /// the write.
    pub async fn handle_callback(&self, payload: CallbackPayload) -> TrackerResult<CallbackOutcome> {
        let notice = match payload.classify() {
            Ok(Callback::Challenge(challenge)) => {
                record_callback("challenge");
                return Ok(CallbackOutcome::Challenge(challenge));
            }
            Ok(Callback::Completion(notice)) => notice,
            Err(e) => {
                warn!(error = %e, "Rejected callback");
                record_callback("invalid");
                return Ok(CallbackOutcome::Invalid(e.to_string()));
            }
        };

        self.apply_notice(notice, Utc::now()).await
    }

    async fn apply_notice(
        &self,
        notice: CompletionNotice,
        now: DateTime<Utc>,
    ) -> TrackerResult<CallbackOutcome> {
        let _guard = self.locks.lock(notice.task_id.as_str()).await;

        let current = self.chain.get_first(&notice.task_id).await.map(|(_, r)| r);
        if let Some(existing) = current.as_ref().filter(|r| r.is_terminal()) {
            warn!(
                task_id = %notice.task_id,
                stored = %existing.status,
                incoming = %notice.status,
                "Callback for finished job ignored"
            );
            record_callback("ignored");
            return Ok(CallbackOutcome::Ignored);
        }

        let artifact = match (&notice.status, notice.file_id.as_deref()) {
            (JobStatus::Success, Some(file_id)) => {
                let kind = current.as_ref().and_then(|r| r.kind);
                Some(self.artifact_outcome(&notice.task_id, kind, file_id, now).await)
            }
            _ => None,
        };

        let next = apply_callback(current.as_ref(), &notice, artifact.as_ref(), now);
        let report = self.chain.put_all(&next).await;
        self.ensure_written(&next.id, &report)?;

        record_callback("applied");
        info!(
            task_id = %next.id,
            status = %next.status,
            public_url = next.public_url.as_deref().unwrap_or(""),
            "Callback applied"
        );
        Ok(CallbackOutcome::Applied(Box::new(next)))
    }

    async fn artifact_outcome(
        &self,
        task_id: &JobId,
        kind: Option<JobKind>,
        file_id: &str,
        now: DateTime<Utc>,
    ) -> ArtifactOutcome {
        match fetch_artifact(&self.provider, &self.layout, task_id, kind, file_id, now).await {
            Ok(stored) => {
                record_artifact(true);
                ArtifactOutcome::Stored {
                    public_url: stored.public_url,
                }
            }
            Err(e) => {
                record_artifact(false);
                warn!(task_id = %task_id, file_id, error = %e, "Artifact step failed");
                ArtifactOutcome::Failed(e.to_string())
            }
        }
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Best-known status, or the pending sentinel.
    pub async fn status(&self, id: &JobId) -> JobLookup {
        match self.chain.get_first(id).await {
            Some((tier, record)) => {
                debug!(task_id = %id, tier = %tier, "Status served");
                JobLookup::Found(Box::new(record))
            }
            None => JobLookup::pending(),
        }
    }

    fn ensure_written(&self, id: &JobId, report: &WriteReport) -> TrackerResult<()> {
        if report.written.is_empty() && !self.chain.is_empty() {
            return Err(TrackerError::StoreUnavailable(id.to_string()));
        }
        Ok(())
    }
}

fn id_of(accepted: &TaskAccepted) -> JobId {
    JobId::from_string(accepted.task_id.clone())
}

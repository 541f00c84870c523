//! Stage descriptors and the processing interface each stage implements.

use async_trait::async_trait;

use crate::error::StageError;
use crate::job::{Job, JobState, JobUpdate};

/// The three states that define a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub name: &'static str,
    /// State a job must be in to be picked up.
    pub source: JobState,
    /// State held while the stage is working on the job.
    pub target: JobState,
    /// State written when the stage succeeds.
    pub next: JobState,
}

impl StageDescriptor {
    pub const CUTTING: StageDescriptor = StageDescriptor {
        name: "cutting",
        source: JobState::New,
        target: JobState::Cutting,
        next: JobState::Cut,
    };

    pub const FORMATTING: StageDescriptor = StageDescriptor {
        name: "formatting",
        source: JobState::Cut,
        target: JobState::Formatting,
        next: JobState::Formatted,
    };

    pub const CAPTIONING: StageDescriptor = StageDescriptor {
        name: "captioning",
        source: JobState::Formatted,
        target: JobState::Captioning,
        next: JobState::Captioned,
    };

    pub const METADATA: StageDescriptor = StageDescriptor {
        name: "metadata",
        source: JobState::Captioned,
        target: JobState::Metadata,
        next: JobState::MetadataReady,
    };

    pub const RENDERING: StageDescriptor = StageDescriptor {
        name: "rendering",
        source: JobState::MetadataReady,
        target: JobState::Rendering,
        next: JobState::ReadyForReview,
    };

    pub const UPLOAD: StageDescriptor = StageDescriptor {
        name: "upload",
        source: JobState::Approved,
        target: JobState::Uploading,
        next: JobState::Published,
    };

    /// The fixed pipeline, in order.
    pub const PIPELINE: [StageDescriptor; 6] = [
        Self::CUTTING,
        Self::FORMATTING,
        Self::CAPTIONING,
        Self::METADATA,
        Self::RENDERING,
        Self::UPLOAD,
    ];
}

/// What a stage reports back for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Work done; the update is written with the move to `next`.
    Completed(JobUpdate),
    /// Work failed; the job goes through the retry policy.
    Failed(String),
    /// Not a failure: the job returns to `source` untouched and is picked
    /// up again by a later poll.
    Deferred(String),
}

#[async_trait]
pub trait StageProcessor: Send + Sync {
    fn descriptor(&self) -> StageDescriptor;

    /// Why the stage cannot take any job right now. Checked before a job is
    /// claimed, so a held job stays in `source` with no audit entries.
    fn hold(&self) -> Option<String> {
        None
    }

    /// Processes one claimed job. An `Err` is treated like `Failed`.
    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError>;
}

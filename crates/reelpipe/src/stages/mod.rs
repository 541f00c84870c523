//! The six concrete pipeline stages.
//!
//! Each stage reads the artifact left by the previous one, hands the work to
//! a collaborator and reports the fields to record on success. Claiming,
//! retries and audit entries are handled by the worker engine.

pub mod captioning;
pub mod cutting;
pub mod formatting;
pub mod metadata;
pub mod rate_limit;
pub mod rendering;
pub mod upload;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use captioning::CaptioningStage;
pub use cutting::CuttingStage;
pub use formatting::FormattingStage;
pub use metadata::MetadataStage;
pub use rate_limit::{Deferral, RateLimiter};
pub use rendering::RenderingStage;
pub use upload::UploadStage;

use crate::collaborators::Collaborators;
use crate::config::UploadConfig;
use crate::error::StageError;
use crate::job::Job;
use crate::storage::ArtifactStorage;
use crate::worker::{StageOutcome, StageProcessor};

/// Builds one processor per stage, in pipeline order. `cancel` interrupts
/// the pre-publish wait of the upload stage.
pub fn build_pipeline(
    collaborators: &Collaborators,
    storage: &ArtifactStorage,
    upload: &UploadConfig,
    cancel: CancellationToken,
) -> Vec<Arc<dyn StageProcessor>> {
    vec![
        Arc::new(CuttingStage::new(
            collaborators.renderer.clone(),
            storage.clone(),
        )) as Arc<dyn StageProcessor>,
        Arc::new(FormattingStage::new(
            collaborators.renderer.clone(),
            storage.clone(),
        )),
        Arc::new(CaptioningStage::new(
            collaborators.renderer.clone(),
            collaborators.content.clone(),
            storage.clone(),
        )),
        Arc::new(MetadataStage::new(
            collaborators.content.clone(),
            storage.clone(),
        )),
        Arc::new(RenderingStage::new(
            collaborators.renderer.clone(),
            storage.clone(),
        )),
        Arc::new(UploadStage::new(
            collaborators.publisher.clone(),
            upload.clone(),
            cancel,
        )),
    ]
}

/// The recorded artifact path, if the file is still there.
pub(crate) fn existing_input(path: Option<&Path>) -> Option<PathBuf> {
    path.filter(|p| p.is_file()).map(Path::to_path_buf)
}

pub(crate) fn missing_input(job: &Job, what: &'static str) -> StageOutcome {
    StageOutcome::Failed(
        StageError::MissingInput {
            job_id: job.id,
            what,
        }
        .to_string(),
    )
}

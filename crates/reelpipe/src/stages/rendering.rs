use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{existing_input, missing_input};
use crate::collaborators::{RenderRequest, RenderStep, Renderer};
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::storage::ArtifactStorage;
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

/// Produces the publishable file. Success hands the job to review.
pub struct RenderingStage {
    renderer: Arc<dyn Renderer>,
    storage: ArtifactStorage,
}

impl RenderingStage {
    pub fn new(renderer: Arc<dyn Renderer>, storage: ArtifactStorage) -> Self {
        Self { renderer, storage }
    }
}

#[async_trait]
impl StageProcessor for RenderingStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::RENDERING
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        let Some(input) = existing_input(job.captioned_path.as_deref()) else {
            return Ok(missing_input(job, "captioned video"));
        };

        let output = self.storage.final_path(job.id);
        self.renderer
            .process(
                job,
                &RenderRequest {
                    step: RenderStep::Final,
                    input,
                    output: output.clone(),
                    caption_file: None,
                },
            )
            .await?;

        info!(job_id = job.id, output = %output.display(), "Rendered final video");
        Ok(StageOutcome::Completed(
            JobUpdate::new().final_path(output).progress(100.0),
        ))
    }
}

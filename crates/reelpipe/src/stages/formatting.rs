use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{existing_input, missing_input};
use crate::collaborators::{RenderRequest, RenderStep, Renderer};
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::storage::ArtifactStorage;
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

/// Converts the cut segment to the vertical short-form format.
pub struct FormattingStage {
    renderer: Arc<dyn Renderer>,
    storage: ArtifactStorage,
}

impl FormattingStage {
    pub fn new(renderer: Arc<dyn Renderer>, storage: ArtifactStorage) -> Self {
        Self { renderer, storage }
    }
}

#[async_trait]
impl StageProcessor for FormattingStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::FORMATTING
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        let Some(input) = existing_input(job.cut_path.as_deref()) else {
            return Ok(missing_input(job, "cut video"));
        };

        let output = self.storage.formatted_path(job.id);
        self.renderer
            .process(
                job,
                &RenderRequest {
                    step: RenderStep::Format,
                    input,
                    output: output.clone(),
                    caption_file: None,
                },
            )
            .await?;

        info!(job_id = job.id, output = %output.display(), "Formatted video");
        Ok(StageOutcome::Completed(
            JobUpdate::new().formatted_path(output).progress(40.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::CopyRenderer;
    use crate::job::JobState;
    use crate::stages::testing;

    #[tokio::test]
    async fn test_format_from_cut() {
        let dir = tempfile::tempdir().unwrap();
        let storage = testing::storage(dir.path());
        testing::touch(&storage.cut_path(2));

        let mut job = Job::sample(2, JobState::Formatting);
        job.cut_path = Some(storage.cut_path(2));

        let stage = FormattingStage::new(Arc::new(CopyRenderer), storage.clone());
        assert_eq!(
            stage.process(&job).await.unwrap(),
            StageOutcome::Completed(
                JobUpdate::new()
                    .formatted_path(storage.formatted_path(2))
                    .progress(40.0)
            )
        );
    }

    #[tokio::test]
    async fn test_missing_cut_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = testing::storage(dir.path());
        let mut job = Job::sample(2, JobState::Formatting);
        job.cut_path = Some(storage.cut_path(2));

        let stage = FormattingStage::new(Arc::new(CopyRenderer), storage);
        assert!(matches!(
            stage.process(&job).await.unwrap(),
            StageOutcome::Failed(_)
        ));
    }
}

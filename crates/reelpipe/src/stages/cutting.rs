use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{existing_input, missing_input};
use crate::collaborators::{RenderRequest, RenderStep, Renderer};
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::storage::ArtifactStorage;
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

/// Extracts the short segment from the stored original.
pub struct CuttingStage {
    renderer: Arc<dyn Renderer>,
    storage: ArtifactStorage,
}

impl CuttingStage {
    pub fn new(renderer: Arc<dyn Renderer>, storage: ArtifactStorage) -> Self {
        Self { renderer, storage }
    }
}

#[async_trait]
impl StageProcessor for CuttingStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::CUTTING
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        // Jobs created without an inbox copy fall back to the source file.
        let recorded = job.original_path.as_deref().or(job.source_path.as_deref());
        let Some(input) = existing_input(recorded) else {
            return Ok(missing_input(job, "original file"));
        };

        let output = self.storage.cut_path(job.id);
        let report = self
            .renderer
            .process(
                job,
                &RenderRequest {
                    step: RenderStep::Cut,
                    input,
                    output: output.clone(),
                    caption_file: None,
                },
            )
            .await?;

        info!(job_id = job.id, output = %output.display(), "Cut segment");

        let mut update = JobUpdate::new().cut_path(output).progress(20.0);
        if let Some(seconds) = report.duration_seconds {
            update = update.duration_seconds(seconds);
        }
        Ok(StageOutcome::Completed(update))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CopyRenderer, RenderReport};
    use crate::job::JobState;
    use crate::stages::testing;

    struct FixedDuration;

    #[async_trait]
    impl Renderer for FixedDuration {
        async fn process(
            &self,
            _job: &Job,
            request: &RenderRequest,
        ) -> Result<RenderReport, StageError> {
            testing::touch(&request.output);
            Ok(RenderReport {
                duration_seconds: Some(42.5),
            })
        }
    }

    #[tokio::test]
    async fn test_cut_writes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let storage = testing::storage(dir.path());
        let original = dir.path().join("originals").join("a.mp4");
        testing::touch(&original);

        let mut job = Job::sample(3, JobState::Cutting);
        job.original_path = Some(original);

        let stage = CuttingStage::new(Arc::new(CopyRenderer), storage.clone());
        let outcome = stage.process(&job).await.unwrap();

        let StageOutcome::Completed(update) = outcome else {
            panic!("expected completion");
        };
        assert_eq!(update.cut_path, Some(storage.cut_path(3)));
        assert_eq!(update.progress, Some(20.0));
        assert!(storage.cut_path(3).is_file());
    }

    #[tokio::test]
    async fn test_cut_records_reported_duration() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("inbox").join("b.mp4");
        testing::touch(&source);

        let mut job = Job::sample(5, JobState::Cutting);
        job.source_path = Some(source);

        let stage = CuttingStage::new(Arc::new(FixedDuration), testing::storage(dir.path()));
        match stage.process(&job).await.unwrap() {
            StageOutcome::Completed(update) => assert_eq!(update.duration_seconds, Some(42.5)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_idea_job_has_no_media() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = Job::sample(9, JobState::Cutting);
        job.source_idea = Some("an idea".to_string());

        let stage = CuttingStage::new(Arc::new(CopyRenderer), testing::storage(dir.path()));
        assert!(matches!(
            stage.process(&job).await.unwrap(),
            StageOutcome::Failed(_)
        ));
    }
}

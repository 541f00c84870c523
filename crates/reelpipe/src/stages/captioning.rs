use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::{existing_input, missing_input};
use crate::collaborators::{ContentGenerator, RenderRequest, RenderStep, Renderer};
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::storage::ArtifactStorage;
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

/// Caption document handed to the renderer.
#[derive(Debug, Serialize)]
struct CaptionDocument<'a> {
    job_id: i64,
    text: &'a str,
    duration: Option<f64>,
}

pub struct CaptioningStage {
    renderer: Arc<dyn Renderer>,
    content: Arc<dyn ContentGenerator>,
    storage: ArtifactStorage,
}

impl CaptioningStage {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        content: Arc<dyn ContentGenerator>,
        storage: ArtifactStorage,
    ) -> Self {
        Self {
            renderer,
            content,
            storage,
        }
    }
}

#[async_trait]
impl StageProcessor for CaptioningStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::CAPTIONING
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        let Some(input) = existing_input(job.formatted_path.as_deref()) else {
            return Ok(missing_input(job, "formatted video"));
        };

        let text = self.content.caption_text(job).await?;
        let caption_file = self.storage.caption_file(job.id);
        self.storage.write_json(
            &caption_file,
            &CaptionDocument {
                job_id: job.id,
                text: &text,
                duration: job.duration_seconds,
            },
        )?;

        let output = self.storage.captioned_path(job.id);
        self.renderer
            .process(
                job,
                &RenderRequest {
                    step: RenderStep::Caption,
                    input,
                    output: output.clone(),
                    caption_file: Some(caption_file.clone()),
                },
            )
            .await?;

        info!(job_id = job.id, captions = %caption_file.display(), "Captioned video");
        Ok(StageOutcome::Completed(
            JobUpdate::new()
                .captioned_path(output)
                .caption_file(caption_file)
                .progress(60.0),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{CopyRenderer, TemplateContentGenerator};
    use crate::job::JobState;
    use crate::stages::testing;

    #[tokio::test]
    async fn test_caption_file_and_video() {
        let dir = tempfile::tempdir().unwrap();
        let storage = testing::storage(dir.path());
        testing::touch(&storage.formatted_path(6));

        let mut job = Job::sample(6, JobState::Captioning);
        job.formatted_path = Some(storage.formatted_path(6));
        job.duration_seconds = Some(30.0);

        let stage = CaptioningStage::new(
            Arc::new(CopyRenderer),
            Arc::new(TemplateContentGenerator),
            storage.clone(),
        );
        let StageOutcome::Completed(update) = stage.process(&job).await.unwrap() else {
            panic!("expected completion");
        };

        assert_eq!(update.captioned_path, Some(storage.captioned_path(6)));
        assert_eq!(update.caption_file, Some(storage.caption_file(6)));
        assert_eq!(update.progress, Some(60.0));

        let doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(storage.caption_file(6)).unwrap()).unwrap();
        assert_eq!(doc["job_id"], 6);
        assert_eq!(doc["duration"], 30.0);
        assert_eq!(doc["text"], "Amazing content coming your way!");
        assert!(storage.captioned_path(6).is_file());
    }

    #[tokio::test]
    async fn test_missing_formatted_video_fails() {
        let dir = tempfile::tempdir().unwrap();
        let job = Job::sample(6, JobState::Captioning);
        let stage = CaptioningStage::new(
            Arc::new(CopyRenderer),
            Arc::new(TemplateContentGenerator),
            testing::storage(dir.path()),
        );
        assert!(matches!(
            stage.process(&job).await.unwrap(),
            StageOutcome::Failed(_)
        ));
    }
}

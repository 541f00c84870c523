use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::collaborators::ContentGenerator;
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::storage::ArtifactStorage;
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

#[derive(Debug, Serialize)]
struct MetadataDocument<'a> {
    job_id: i64,
    title: &'a str,
    description: &'a str,
    hashtags: &'a [String],
    generated_at: String,
}

/// Generates title, description and hashtags for the clip.
pub struct MetadataStage {
    content: Arc<dyn ContentGenerator>,
    storage: ArtifactStorage,
}

impl MetadataStage {
    pub fn new(content: Arc<dyn ContentGenerator>, storage: ArtifactStorage) -> Self {
        Self { content, storage }
    }
}

#[async_trait]
impl StageProcessor for MetadataStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::METADATA
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        let generated = self.content.generate(job).await?;

        let path = self.storage.metadata_file(job.id);
        self.storage.write_json(
            &path,
            &MetadataDocument {
                job_id: job.id,
                title: &generated.title,
                description: &generated.description,
                hashtags: &generated.hashtags,
                generated_at: Utc::now().to_rfc3339(),
            },
        )?;

        info!(job_id = job.id, title = %generated.title, "Generated metadata");
        Ok(StageOutcome::Completed(
            JobUpdate::new()
                .hashtags(generated.hashtag_line())
                .title(generated.title)
                .description(generated.description)
                .metadata_file(path)
                .progress(80.0),
        ))
    }
}

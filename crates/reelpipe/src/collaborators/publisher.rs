use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::error::StageError;
use crate::job::Job;

/// Identifiers returned by the hosting platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReceipt {
    pub external_id: String,
    pub external_url: String,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, job: &Job, artifact: &Path) -> Result<PublishReceipt, StageError>;
}

/// Publisher that uploads nothing and returns a synthetic id.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubPublisher;

#[async_trait]
impl Publisher for StubPublisher {
    async fn publish(&self, job: &Job, artifact: &Path) -> Result<PublishReceipt, StageError> {
        tracing::warn!(
            job_id = job.id,
            artifact = %artifact.display(),
            "Stub publish, nothing was uploaded"
        );
        let external_id = format!("STUB_{}_{}", job.id, Utc::now().timestamp());
        Ok(PublishReceipt {
            external_url: format!("https://youtube.com/watch?v={}", external_id),
            external_id,
        })
    }
}

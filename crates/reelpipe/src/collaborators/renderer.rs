use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StageError;
use crate::job::Job;

/// Which media transformation a stage asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    /// Extract the short segment from the source.
    Cut,
    /// Convert to the vertical short-form aspect ratio.
    Format,
    /// Burn captions into the picture.
    Caption,
    /// Produce the publishable file.
    Final,
}

impl fmt::Display for RenderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStep::Cut => "cut",
            RenderStep::Format => "format",
            RenderStep::Caption => "caption",
            RenderStep::Final => "final",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub step: RenderStep,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Caption document to burn in, for `RenderStep::Caption`.
    pub caption_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    /// Length of the produced clip, when the renderer knows it.
    pub duration_seconds: Option<f64>,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Reads `request.input` and writes `request.output`.
    async fn process(&self, job: &Job, request: &RenderRequest) -> Result<RenderReport, StageError>;
}

/// Renderer that copies the input unchanged. Keeps the pipeline runnable
/// without a media toolchain.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyRenderer;

#[async_trait]
impl Renderer for CopyRenderer {
    async fn process(&self, job: &Job, request: &RenderRequest) -> Result<RenderReport, StageError> {
        if let Some(parent) = request.output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| render_io(parent, e))?;
        }
        let bytes = tokio::fs::copy(&request.input, &request.output)
            .await
            .map_err(|e| render_io(&request.input, e))?;

        tracing::debug!(
            job_id = job.id,
            step = %request.step,
            bytes,
            output = %request.output.display(),
            "Copied artifact"
        );

        Ok(RenderReport {
            duration_seconds: job.duration_seconds,
        })
    }
}

fn render_io(path: &Path, e: std::io::Error) -> StageError {
    StageError::Render(format!("{}: {}", path.display(), e))
}

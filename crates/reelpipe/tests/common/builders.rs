//! Scripted collaborators for driving stages into specific outcomes.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;

use reelpipe::collaborators::{
    PublishReceipt, Publisher, RenderReport, RenderRequest, Renderer,
};
use reelpipe::{Job, StageError};

/// Renderer that fails every call with the same message.
pub struct FailingRenderer {
    pub message: String,
    pub calls: AtomicUsize,
}

impl FailingRenderer {
    pub fn new(message: &str) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FailingRenderer {
    async fn process(&self, _job: &Job, _request: &RenderRequest) -> Result<RenderReport, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StageError::Render(self.message.clone()))
    }
}

/// Publisher that records when each publish happened.
#[derive(Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<(i64, Instant)>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.published.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, job: &Job, _artifact: &Path) -> Result<PublishReceipt, StageError> {
        self.published.lock().unwrap().push((job.id, Instant::now()));
        Ok(PublishReceipt {
            external_id: format!("vid{}", job.id),
            external_url: format!("https://example.invalid/v/vid{}", job.id),
        })
    }
}

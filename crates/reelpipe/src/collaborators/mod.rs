//! Interfaces to the media, content and publishing backends.
//!
//! The pipeline only depends on these traits. The default implementations
//! are local stand-ins: they move bytes and fill templates but never call a
//! codec or a hosting platform.

pub mod content;
pub mod publisher;
pub mod renderer;

use std::sync::Arc;

pub use content::{ContentGenerator, GeneratedMetadata, TemplateContentGenerator};
pub use publisher::{PublishReceipt, Publisher, StubPublisher};
pub use renderer::{CopyRenderer, RenderReport, RenderRequest, RenderStep, Renderer};

/// The three backends the stage workers call into.
#[derive(Clone)]
pub struct Collaborators {
    pub renderer: Arc<dyn Renderer>,
    pub content: Arc<dyn ContentGenerator>,
    pub publisher: Arc<dyn Publisher>,
}

impl Collaborators {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        content: Arc<dyn ContentGenerator>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            renderer,
            content,
            publisher,
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            renderer: Arc::new(CopyRenderer),
            content: Arc::new(TemplateContentGenerator),
            publisher: Arc::new(StubPublisher),
        }
    }
}

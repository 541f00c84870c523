use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::{JobState, SourceKind};

/// A content item tracked through the production pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub source_kind: SourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_idea: Option<String>,

    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_data: Option<String>,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cut_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captioned_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_file: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl Job {
    /// Short label used in log lines: the idea text or the source file name.
    pub fn label(&self) -> String {
        if let Some(idea) = &self.source_idea {
            return idea.chars().take(50).collect();
        }
        self.source_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("job {}", self.id))
    }
}

#[cfg(test)]
impl Job {
    /// A detached job value for unit tests that do not need a store.
    pub(crate) fn sample(id: i64, state: JobState) -> Self {
        let now = Utc::now();
        Job {
            id,
            created_at: now,
            updated_at: now,
            source_kind: SourceKind::Clip,
            source_path: None,
            source_idea: None,
            state,
            state_data: None,
            progress: 0.0,
            error_message: None,
            retry_count: 0,
            original_path: None,
            cut_path: None,
            formatted_path: None,
            captioned_path: None,
            final_path: None,
            caption_file: None,
            metadata_file: None,
            title: None,
            description: None,
            hashtags: None,
            duration_seconds: None,
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
            uploaded_at: None,
            video_id: None,
            video_url: None,
        }
    }
}

/// Input for `JobStore::create_job`.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub source_kind: SourceKind,
    pub source_path: Option<PathBuf>,
    pub source_idea: Option<String>,
    /// Durable copy of the source file, when the inbox made one.
    pub original_path: Option<PathBuf>,
}

impl NewJob {
    pub fn from_file(source_kind: SourceKind, source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_kind,
            source_path: Some(source_path.into()),
            source_idea: None,
            original_path: None,
        }
    }

    pub fn from_idea(idea: impl Into<String>) -> Self {
        Self {
            source_kind: SourceKind::Idea,
            source_path: None,
            source_idea: Some(idea.into()),
            original_path: None,
        }
    }

    pub fn with_original_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.original_path = Some(path.into());
        self
    }
}

/// Optional field assignments applied together with a state transition.
///
/// Only fields that are set are written; everything else is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub state_data: Option<String>,
    pub progress: Option<f64>,
    pub retry_count: Option<u32>,
    pub clear_error: bool,

    pub original_path: Option<PathBuf>,
    pub cut_path: Option<PathBuf>,
    pub formatted_path: Option<PathBuf>,
    pub captioned_path: Option<PathBuf>,
    pub final_path: Option<PathBuf>,
    pub caption_file: Option<PathBuf>,
    pub metadata_file: Option<PathBuf>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub hashtags: Option<String>,
    pub duration_seconds: Option<f64>,

    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,

    pub uploaded_at: Option<DateTime<Utc>>,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state_data(mut self, data: impl Into<String>) -> Self {
        self.state_data = Some(data.into());
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress.clamp(0.0, 100.0));
        self
    }

    pub fn retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.clear_error = true;
        self
    }

    pub fn original_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.original_path = Some(path.into());
        self
    }

    pub fn cut_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cut_path = Some(path.into());
        self
    }

    pub fn formatted_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.formatted_path = Some(path.into());
        self
    }

    pub fn captioned_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.captioned_path = Some(path.into());
        self
    }

    pub fn final_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.final_path = Some(path.into());
        self
    }

    pub fn caption_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.caption_file = Some(path.into());
        self
    }

    pub fn metadata_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_file = Some(path.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn hashtags(mut self, hashtags: impl Into<String>) -> Self {
        self.hashtags = Some(hashtags.into());
        self
    }

    pub fn duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn reviewed(
        mut self,
        at: DateTime<Utc>,
        by: impl Into<String>,
        notes: Option<String>,
    ) -> Self {
        self.reviewed_at = Some(at);
        self.reviewed_by = Some(by.into());
        self.review_notes = notes;
        self
    }

    pub fn review_notes(mut self, notes: impl Into<String>) -> Self {
        self.review_notes = Some(notes.into());
        self
    }

    pub fn published(
        mut self,
        at: DateTime<Utc>,
        video_id: impl Into<String>,
        video_url: impl Into<String>,
    ) -> Self {
        self.uploaded_at = Some(at);
        self.video_id = Some(video_id.into());
        self.video_url = Some(video_url.into());
        self
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    /// `None` for system-level events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<i64>,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub success: bool,
}

/// Audit action tags written by the store and the worker manager.
pub mod actions {
    pub const JOB_CREATED: &str = "JOB_CREATED";
    pub const STATE_CHANGE: &str = "STATE_CHANGE";
    pub const WORKERS_STARTED: &str = "WORKERS_STARTED";
    pub const WORKERS_STOPPED: &str = "WORKERS_STOPPED";
}

/// Job counts, total and per state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub total: u64,
    pub by_state: BTreeMap<JobState, u64>,
}

impl JobStats {
    pub fn count(&self, state: JobState) -> u64 {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(JobUpdate::new().progress(140.0).progress, Some(100.0));
        assert_eq!(JobUpdate::new().progress(-3.0).progress, Some(0.0));
    }

    #[test]
    fn test_new_job_builders() {
        let job = NewJob::from_file(SourceKind::Clip, "/inbox/clips/a.mp4")
            .with_original_path("/storage/originals/a.mp4");
        assert_eq!(job.source_kind, SourceKind::Clip);
        assert_eq!(job.original_path, Some(PathBuf::from("/storage/originals/a.mp4")));
        assert!(job.source_idea.is_none());

        let idea = NewJob::from_idea("abc");
        assert_eq!(idea.source_kind, SourceKind::Idea);
        assert_eq!(idea.source_idea.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_update_sets_nothing() {
        let update = JobUpdate::new();
        assert_eq!(update, JobUpdate::default());
        assert!(!update.clear_error);
    }
}

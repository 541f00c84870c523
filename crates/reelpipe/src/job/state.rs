//! Pipeline states and source kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a job. Persisted as SCREAMING_SNAKE_CASE text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    New,
    Cutting,
    Cut,
    Formatting,
    Formatted,
    Captioning,
    Captioned,
    Metadata,
    MetadataReady,
    Rendering,
    ReadyForReview,
    Approved,
    Rejected,
    Uploading,
    Published,
    Failed,
}

impl JobState {
    /// Every state, in pipeline order.
    pub const ALL: [JobState; 16] = [
        JobState::New,
        JobState::Cutting,
        JobState::Cut,
        JobState::Formatting,
        JobState::Formatted,
        JobState::Captioning,
        JobState::Captioned,
        JobState::Metadata,
        JobState::MetadataReady,
        JobState::Rendering,
        JobState::ReadyForReview,
        JobState::Approved,
        JobState::Rejected,
        JobState::Uploading,
        JobState::Published,
        JobState::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::New => "NEW",
            JobState::Cutting => "CUTTING",
            JobState::Cut => "CUT",
            JobState::Formatting => "FORMATTING",
            JobState::Formatted => "FORMATTED",
            JobState::Captioning => "CAPTIONING",
            JobState::Captioned => "CAPTIONED",
            JobState::Metadata => "METADATA",
            JobState::MetadataReady => "METADATA_READY",
            JobState::Rendering => "RENDERING",
            JobState::ReadyForReview => "READY_FOR_REVIEW",
            JobState::Approved => "APPROVED",
            JobState::Rejected => "REJECTED",
            JobState::Uploading => "UPLOADING",
            JobState::Published => "PUBLISHED",
            JobState::Failed => "FAILED",
        }
    }

    /// No automatic transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            JobState::Published | JobState::Rejected | JobState::Failed => true,
            JobState::New
            | JobState::Cutting
            | JobState::Cut
            | JobState::Formatting
            | JobState::Formatted
            | JobState::Captioning
            | JobState::Captioned
            | JobState::Metadata
            | JobState::MetadataReady
            | JobState::Rendering
            | JobState::ReadyForReview
            | JobState::Approved
            | JobState::Uploading => false,
        }
    }

    /// True while a stage worker holds the job.
    pub fn is_in_progress(&self) -> bool {
        match self {
            JobState::Cutting
            | JobState::Formatting
            | JobState::Captioning
            | JobState::Metadata
            | JobState::Rendering
            | JobState::Uploading => true,
            JobState::New
            | JobState::Cut
            | JobState::Formatted
            | JobState::Captioned
            | JobState::MetadataReady
            | JobState::ReadyForReview
            | JobState::Approved
            | JobState::Rejected
            | JobState::Published
            | JobState::Failed => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown job state '{}'", s))
    }
}

/// Where a job's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    LongVideo,
    Clip,
    Idea,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::LongVideo => "long_video",
            SourceKind::Clip => "clip",
            SourceKind::Idea => "idea",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "long_video" => Ok(SourceKind::LongVideo),
            "clip" => Ok(SourceKind::Clip),
            "idea" => Ok(SourceKind::Idea),
            other => Err(format!("unknown source kind '{}'", other)),
        }
    }
}

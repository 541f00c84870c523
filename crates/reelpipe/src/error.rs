use std::path::PathBuf;
use thiserror::Error;

use crate::job::JobState;

#[derive(Error, Debug)]
pub enum ReelpipeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Inbox error: {0}")]
    Inbox(#[from] InboxError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// A processing fault raised inside a stage. Always handled by the worker's
/// retry path, never propagated past it.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Missing input artifact for job {job_id}: {what}")]
    MissingInput { job_id: i64, what: &'static str },

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Content generation failed: {0}")]
    Content(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy file from '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("No free file name left for: {0}")]
    FileExists(PathBuf),
}

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Job {0} not found")]
    NotFound(i64),

    #[error("Job {id} is {actual}, expected {expected}")]
    InvalidState {
        id: i64,
        expected: JobState,
        actual: JobState,
    },

    #[error(transparent)]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, ReelpipeError>;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub inbox: InboxConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database/reelpipe.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inbox: InboxConfig::default(),
            storage: StorageConfig::default(),
            upload: UploadConfig::default(),
            worker: WorkerConfig::default(),
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxConfig {
    #[serde(default = "default_long_videos")]
    pub long_videos: PathBuf,
    #[serde(default = "default_clips")]
    pub clips: PathBuf,
    #[serde(default = "default_ideas")]
    pub ideas: PathBuf,
    /// Wait after a file event before touching the file, so the writer can finish.
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_long_videos() -> PathBuf {
    PathBuf::from("INBOX/long_videos")
}

fn default_clips() -> PathBuf {
    PathBuf::from("INBOX/clips")
}

fn default_ideas() -> PathBuf {
    PathBuf::from("INBOX/ideas.txt")
}

fn default_settle_millis() -> u64 {
    2000
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            long_videos: default_long_videos(),
            clips: default_clips(),
            ideas: default_ideas(),
            settle_millis: default_settle_millis(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl InboxConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_originals")]
    pub originals: PathBuf,
    #[serde(default = "default_intermediate")]
    pub intermediate: PathBuf,
    #[serde(default = "default_finals")]
    pub finals: PathBuf,
    #[serde(default = "default_captions")]
    pub captions: PathBuf,
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
}

fn default_originals() -> PathBuf {
    PathBuf::from("storage/originals")
}

fn default_intermediate() -> PathBuf {
    PathBuf::from("storage/intermediate")
}

fn default_finals() -> PathBuf {
    PathBuf::from("storage/finals")
}

fn default_captions() -> PathBuf {
    PathBuf::from("storage/captions")
}

fn default_metadata() -> PathBuf {
    PathBuf::from("storage/metadata")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            originals: default_originals(),
            intermediate: default_intermediate(),
            finals: default_finals(),
            captions: default_captions(),
            metadata: default_metadata(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Publishing is off unless explicitly enabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_delay")]
    pub min_delay_minutes: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_minutes: u64,
    #[serde(default = "default_max_per_day")]
    pub max_per_day: u32,
}

fn default_min_delay() -> u64 {
    60
}

fn default_max_delay() -> u64 {
    180
}

fn default_max_per_day() -> u32 {
    5
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_delay_minutes: default_min_delay(),
            max_delay_minutes: default_max_delay(),
            max_per_day: default_max_per_day(),
        }
    }
}

impl UploadConfig {
    pub fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_minutes * 60)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_minutes * 60)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,
    #[serde(default = "default_idle_poll")]
    pub idle_poll_seconds: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_seconds: u64,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    60
}

fn default_idle_poll() -> u64 {
    5
}

fn default_error_backoff() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay(),
            idle_poll_seconds: default_idle_poll(),
            error_backoff_seconds: default_error_backoff(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

impl WorkerConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_secs(self.idle_poll_seconds)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_seconds)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

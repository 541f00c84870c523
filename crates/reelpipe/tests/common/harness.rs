//! Isolated environment for pipeline tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use reelpipe::config::{Config, InboxConfig, StorageConfig, UploadConfig, WorkerConfig};
use reelpipe::worker::RetryPolicy;
use reelpipe::{
    ArtifactStorage, InboxWatcher, Job, JobState, JobStore, JobUpdate, NewJob, SourceKind,
    StageProcessor, StageWorker,
};

pub struct TestHarness {
    temp_dir: TempDir,
    pub config: Config,
    pub store: JobStore,
}

impl TestHarness {
    /// Uploads enabled with no spacing, short worker intervals.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        let mut config = Config {
            inbox: InboxConfig {
                long_videos: root.join("INBOX").join("long_videos"),
                clips: root.join("INBOX").join("clips"),
                ideas: root.join("INBOX").join("ideas.txt"),
                settle_millis: 0,
                poll_interval_secs: 1,
            },
            storage: StorageConfig {
                originals: root.join("storage").join("originals"),
                intermediate: root.join("storage").join("intermediate"),
                finals: root.join("storage").join("finals"),
                captions: root.join("storage").join("captions"),
                metadata: root.join("storage").join("metadata"),
            },
            upload: UploadConfig {
                enabled: true,
                min_delay_minutes: 0,
                max_delay_minutes: 0,
                max_per_day: 5,
            },
            worker: WorkerConfig {
                max_retries: 3,
                retry_delay_seconds: 1,
                idle_poll_seconds: 1,
                error_backoff_seconds: 1,
                shutdown_timeout_seconds: 5,
            },
            database_path: root.join("database").join("reelpipe.db"),
        };
        adjust(&mut config);

        let store = JobStore::open(&config.database_path).expect("Failed to open store");

        Self {
            temp_dir,
            config,
            store,
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A second store handle on the same database file, as after a restart.
    pub fn reopen_store(&self) -> JobStore {
        JobStore::open(&self.config.database_path).expect("Failed to reopen store")
    }

    pub fn storage(&self) -> ArtifactStorage {
        ArtifactStorage::new(self.config.storage.clone())
    }

    pub fn inbox(&self) -> InboxWatcher {
        let watcher = InboxWatcher::from_config(&self.config, self.store.clone());
        watcher.prepare().expect("Failed to prepare inbox");
        watcher
    }

    /// Writes a media file into the clips drop directory.
    pub fn drop_clip(&self, name: &str) -> PathBuf {
        let path = self.config.inbox.clips.join(name);
        std::fs::create_dir_all(&self.config.inbox.clips).expect("Failed to create clips dir");
        std::fs::write(&path, b"fake video frames").expect("Failed to write clip");
        path
    }

    pub fn write_ideas(&self, text: &str) {
        if let Some(parent) = self.config.inbox.ideas.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create inbox dir");
        }
        std::fs::write(&self.config.inbox.ideas, text).expect("Failed to write ideas");
    }

    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.config.worker.max_retries,
            retry_delay: Duration::from_millis(10),
            idle_poll: Duration::from_millis(10),
            error_backoff: Duration::from_millis(10),
        }
    }

    pub fn worker(&self, processor: Arc<dyn StageProcessor>) -> StageWorker {
        StageWorker::new(self.store.clone(), processor, self.policy())
    }

    /// A clip job whose original exists in storage.
    pub fn clip_job(&self, name: &str) -> Job {
        let clip = self.drop_clip(name);
        let original = self
            .storage()
            .store_original(&clip)
            .expect("Failed to store original");
        self.store
            .create_job(&NewJob::from_file(SourceKind::Clip, clip).with_original_path(original))
            .expect("Failed to create job")
    }

    /// A job parked in `state` with `update` applied.
    pub fn job_in_state(&self, state: JobState, update: &JobUpdate) -> Job {
        let job = self
            .store
            .create_job(&NewJob::from_file(SourceKind::Clip, "seed.mp4"))
            .expect("Failed to create job");
        self.store
            .update_job_state(job.id, state, None, update)
            .expect("Failed to update job")
            .expect("Job vanished")
    }

    /// An approved job with a final video on disk.
    pub fn approved_job(&self) -> Job {
        let job = self
            .store
            .create_job(&NewJob::from_file(SourceKind::Clip, "seed.mp4"))
            .expect("Failed to create job");
        let final_path = self.storage().final_path(job.id);
        std::fs::create_dir_all(final_path.parent().expect("final path has a parent"))
            .expect("Failed to create finals dir");
        std::fs::write(&final_path, b"final cut").expect("Failed to write final video");
        self.store
            .update_job_state(
                job.id,
                JobState::Approved,
                None,
                &JobUpdate::new().final_path(final_path),
            )
            .expect("Failed to update job")
            .expect("Job vanished")
    }

    pub fn state_of(&self, id: i64) -> JobState {
        self.store
            .get_job(id)
            .expect("Failed to load job")
            .expect("Job not found")
            .state
    }

    /// Polls until `check` holds or `timeout` passes.
    pub async fn wait_for(&self, timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        check()
    }
}

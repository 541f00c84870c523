//! Supervises one worker task per pipeline stage.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::job::actions;
use crate::stages;
use crate::storage::ArtifactStorage;
use crate::store::JobStore;
use crate::worker::engine::{RetryPolicy, StageWorker};

pub struct WorkerManager {
    store: JobStore,
    /// Workers not yet spawned. Emptied by `start`.
    pending: Mutex<Vec<StageWorker>>,
    stage_names: Vec<&'static str>,
    cancellation_token: CancellationToken,
    tasks: Mutex<Option<JoinSet<&'static str>>>,
    shutdown_timeout: Duration,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl WorkerManager {
    pub fn new(store: JobStore, workers: Vec<StageWorker>, shutdown_timeout: Duration) -> Self {
        let stage_names = workers.iter().map(StageWorker::name).collect();
        Self {
            store,
            pending: Mutex::new(workers),
            stage_names,
            cancellation_token: CancellationToken::new(),
            tasks: Mutex::new(Some(JoinSet::new())),
            shutdown_timeout,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Builds the six pipeline workers from configuration.
    pub fn from_config(store: JobStore, config: &Config, collaborators: Collaborators) -> Self {
        let cancellation_token = CancellationToken::new();
        let storage = ArtifactStorage::new(config.storage.clone());
        let policy = RetryPolicy::from(&config.worker);

        let workers = stages::build_pipeline(
            &collaborators,
            &storage,
            &config.upload,
            cancellation_token.child_token(),
        )
        .into_iter()
        .map(|processor| StageWorker::new(store.clone(), processor, policy.clone()))
        .collect();

        let mut manager = Self::new(store, workers, config.worker.shutdown_timeout());
        manager.cancellation_token = cancellation_token;
        manager
    }

    pub fn stage_names(&self) -> &[&'static str] {
        &self.stage_names
    }

    /// A token cancelled when the manager stops. Other long-running tasks
    /// (the inbox watcher) can follow it.
    pub fn child_token(&self) -> CancellationToken {
        self.cancellation_token.child_token()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Spawns every worker onto the current tokio runtime. Calling it again
    /// has no effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Workers already started");
            return;
        }

        let workers: Vec<StageWorker> = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let count = workers.len();

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref mut join_set) = *tasks {
            for worker in workers {
                let token = self.cancellation_token.child_token();
                join_set.spawn(worker.run(token));
            }
        }

        info!("Started {} stage workers: {}", count, self.stage_names.join(", "));
        let details = format!("Started {} workers: {}", count, self.stage_names.join(", "));
        if let Err(e) = self
            .store
            .log_activity(None, actions::WORKERS_STARTED, Some(&details), true)
        {
            error!(error = %e, "Failed to record worker start");
        }
    }

    /// Asks every worker to stop at its next safe point. Only the first call
    /// has an effect.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Stopping stage workers");
        self.cancellation_token.cancel();

        if self.started.load(Ordering::SeqCst) {
            if let Err(e) = self.store.log_activity(
                None,
                actions::WORKERS_STOPPED,
                Some("Stop requested"),
                true,
            ) {
                error!(error = %e, "Failed to record worker stop");
            }
        }
    }

    /// Stops the workers and waits for them, up to the shutdown timeout.
    /// Workers still busy after that are aborted; their jobs are recovered
    /// the next time the stage starts.
    pub async fn shutdown(&self) {
        self.stop();

        let join_set = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut join_set) = join_set else {
            return;
        };

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while let Some(result) = join_set.join_next().await {
                match result {
                    Ok(name) => debug!(stage = name, "Worker finished"),
                    Err(e) => error!(error = %e, "Worker task failed"),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = join_set.len(),
                "Workers did not stop within {:?}, aborting",
                self.shutdown_timeout
            );
            join_set.abort_all();
            while join_set.join_next().await.is_some() {}
        }

        info!("All stage workers have stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StageError;
    use crate::job::{Job, JobState};
    use crate::worker::stage::{StageDescriptor, StageOutcome, StageProcessor};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Sleeper;

    #[async_trait]
    impl StageProcessor for Sleeper {
        fn descriptor(&self) -> StageDescriptor {
            StageDescriptor::CUTTING
        }

        async fn process(&self, _job: &Job) -> Result<StageOutcome, StageError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(StageOutcome::Failed("unreachable".to_string()))
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_secs(60),
            idle_poll: Duration::from_secs(60),
            error_backoff: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_from_config_builds_six_stages() {
        let store = JobStore::open_in_memory().unwrap();
        let manager = WorkerManager::from_config(store, &Config::default(), Collaborators::default());
        assert_eq!(
            manager.stage_names(),
            &["cutting", "formatting", "captioning", "metadata", "rendering", "upload"]
        );
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let store = JobStore::open_in_memory().unwrap();
        let worker = StageWorker::new(store.clone(), Arc::new(Sleeper), quick_policy());
        let manager = WorkerManager::new(store.clone(), vec![worker], Duration::from_secs(1));

        manager.start();
        manager.start();
        manager.stop();
        manager.stop();
        manager.shutdown().await;
        manager.shutdown().await;

        assert!(manager.is_stopped());
        assert_eq!(store.count_activity(None, actions::WORKERS_STARTED).unwrap(), 1);
        assert_eq!(store.count_activity(None, actions::WORKERS_STOPPED).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_idle_workers_stop_promptly() {
        let store = JobStore::open_in_memory().unwrap();
        let worker = StageWorker::new(store.clone(), Arc::new(Sleeper), quick_policy());
        let manager = WorkerManager::new(store, vec![worker], Duration::from_secs(5));

        manager.start();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let started = std::time::Instant::now();
        manager.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_busy_worker_is_aborted_after_timeout() {
        let store = JobStore::open_in_memory().unwrap();
        let job = store
            .create_job(&crate::job::NewJob::from_file(crate::job::SourceKind::Clip, "a.mp4"))
            .unwrap();
        let worker = StageWorker::new(store.clone(), Arc::new(Sleeper), quick_policy());
        let manager = WorkerManager::new(store.clone(), vec![worker], Duration::from_millis(100));

        manager.start();
        for _ in 0..200 {
            if store.get_job(job.id).unwrap().unwrap().state == JobState::Cutting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let started = std::time::Instant::now();
        manager.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(5));
        // The claim is left in place for recovery on the next start.
        assert_eq!(store.get_job(job.id).unwrap().unwrap().state, JobState::Cutting);
    }

    #[tokio::test]
    async fn test_stop_without_start_logs_nothing() {
        let store = JobStore::open_in_memory().unwrap();
        let manager = WorkerManager::new(store.clone(), Vec::new(), Duration::from_secs(1));
        manager.stop();
        assert_eq!(store.count_activity(None, actions::WORKERS_STOPPED).unwrap(), 0);
    }
}

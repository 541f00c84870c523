//! The polling loop shared by every stage.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::WorkerConfig;
use crate::db::DatabaseError;
use crate::job::{Job, JobState, JobUpdate};
use crate::store::{JobStore, Transition};
use crate::worker::stage::{StageDescriptor, StageOutcome, StageProcessor};

/// Retry budget and the suspension intervals of the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub idle_poll: Duration,
    pub error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for RetryPolicy {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
            idle_poll: config.idle_poll(),
            error_backoff: config.error_backoff(),
        }
    }
}

/// Result of a single poll iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing in the source state.
    Idle,
    Completed { job_id: i64 },
    /// Failed and sent back to the source state for another attempt.
    Retrying { job_id: i64, attempt: u32 },
    /// Failed for the last time; now `FAILED`.
    Failed { job_id: i64 },
    Deferred { job_id: i64 },
    /// The stage refused work before claiming; the job was not touched.
    Held { job_id: i64, reason: String },
    /// The job changed state under us; nothing was done to it.
    Contended { job_id: i64 },
}

/// Runs one stage: polls the store for work, processes it, and writes the
/// resulting transition.
pub struct StageWorker {
    store: JobStore,
    processor: Arc<dyn StageProcessor>,
    descriptor: StageDescriptor,
    policy: RetryPolicy,
}

impl StageWorker {
    pub fn new(store: JobStore, processor: Arc<dyn StageProcessor>, policy: RetryPolicy) -> Self {
        let descriptor = processor.descriptor();
        Self {
            store,
            processor,
            descriptor,
            policy,
        }
    }

    pub fn descriptor(&self) -> StageDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    /// Returns jobs stranded in this stage's in-progress state (by a crash
    /// or an aborted shutdown) to the source state.
    pub fn recover(&self) -> Result<Vec<i64>, DatabaseError> {
        self.store
            .reset_in_progress(self.descriptor.target, self.descriptor.source)
    }

    /// One iteration of the loop, without the trailing sleep.
    pub async fn poll_once(&self) -> Result<PollOutcome, DatabaseError> {
        let StageDescriptor {
            source,
            target,
            next,
            ..
        } = self.descriptor;

        let Some(job) = self.store.get_jobs_by_state(source, 1)?.into_iter().next() else {
            return Ok(PollOutcome::Idle);
        };

        if let Some(reason) = self.processor.hold() {
            debug!(job_id = job.id, reason = %reason, "Stage is holding work");
            return Ok(PollOutcome::Held {
                job_id: job.id,
                reason,
            });
        }

        let claimed = match self.store.compare_and_transition(
            job.id,
            source,
            target,
            None,
            &JobUpdate::new().clear_error(),
        )? {
            Transition::Applied(job) => job,
            Transition::NotFound | Transition::StateMismatch(_) => {
                debug!(job_id = job.id, "Job was claimed elsewhere");
                return Ok(PollOutcome::Contended { job_id: job.id });
            }
        };

        info!(job_id = claimed.id, retry = claimed.retry_count, "Processing started");

        let result = AssertUnwindSafe(self.processor.process(&claimed))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!(job_id = claimed.id, error = %e, "Processing fault");
                StageOutcome::Failed(e.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(job_id = claimed.id, error = %message, "Processor panicked");
                StageOutcome::Failed(format!("processor panicked: {}", message))
            }
        };

        match outcome {
            StageOutcome::Completed(update) => {
                // A new stage starts with a fresh retry budget.
                let update = update.retry_count(0);
                match self
                    .store
                    .compare_and_transition(claimed.id, target, next, None, &update)?
                {
                    Transition::Applied(_) => {
                        info!(job_id = claimed.id, next = %next, "Processing completed");
                        Ok(PollOutcome::Completed { job_id: claimed.id })
                    }
                    other => Ok(self.lost_claim(claimed.id, other)),
                }
            }
            StageOutcome::Failed(message) => self.handle_failure(&claimed, &message),
            StageOutcome::Deferred(reason) => {
                let update = JobUpdate::new()
                    .state_data(serde_json::json!({ "deferred_reason": reason }).to_string());
                match self
                    .store
                    .compare_and_transition(claimed.id, target, source, None, &update)?
                {
                    Transition::Applied(_) => {
                        info!(job_id = claimed.id, reason = %reason, "Processing deferred");
                        Ok(PollOutcome::Deferred { job_id: claimed.id })
                    }
                    other => Ok(self.lost_claim(claimed.id, other)),
                }
            }
        }
    }

    fn handle_failure(&self, job: &Job, message: &str) -> Result<PollOutcome, DatabaseError> {
        let attempt = job.retry_count + 1;
        let update = JobUpdate::new().retry_count(attempt);

        if attempt >= self.policy.max_retries {
            let result = self.store.compare_and_transition(
                job.id,
                self.descriptor.target,
                JobState::Failed,
                Some(message),
                &update,
            )?;
            if let Transition::Applied(_) = result {
                error!(job_id = job.id, attempts = attempt, error = %message, "Job failed");
                return Ok(PollOutcome::Failed { job_id: job.id });
            }
            return Ok(self.lost_claim(job.id, result));
        }

        let result = self.store.compare_and_transition(
            job.id,
            self.descriptor.target,
            self.descriptor.source,
            Some(message),
            &update,
        )?;
        if let Transition::Applied(_) = result {
            warn!(
                job_id = job.id,
                "Retry {}/{}: {}",
                attempt,
                self.policy.max_retries,
                message
            );
            return Ok(PollOutcome::Retrying {
                job_id: job.id,
                attempt,
            });
        }
        Ok(self.lost_claim(job.id, result))
    }

    fn lost_claim(&self, job_id: i64, transition: Transition) -> PollOutcome {
        match transition {
            Transition::StateMismatch(actual) => {
                warn!(job_id, actual = %actual, "Job left the in-progress state during processing");
            }
            Transition::NotFound => warn!(job_id, "Job disappeared during processing"),
            Transition::Applied(_) => {}
        }
        PollOutcome::Contended { job_id }
    }

    fn recover_logged(&self) {
        match self.recover() {
            Ok(ids) if !ids.is_empty() => {
                warn!(count = ids.len(), "Recovered interrupted jobs: {:?}", ids)
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Recovery of interrupted jobs failed"),
        }
    }

    /// Polls until `token` is cancelled. Cancellation interrupts the idle,
    /// retry and backoff sleeps but never an in-flight `process` call.
    ///
    /// Held and deferred jobs wait out the retry delay, like a failed attempt.
    pub async fn run(self, token: CancellationToken) -> &'static str {
        let name = self.descriptor.name;
        let span = info_span!("stage", stage = name);

        async move {
            self.recover_logged();

            info!("Worker started");

            while !token.is_cancelled() {
                let mut store_failed = false;
                let pause = match self.poll_once().await {
                    Ok(PollOutcome::Idle) => Some(self.policy.idle_poll),
                    Ok(PollOutcome::Retrying { .. })
                    | Ok(PollOutcome::Deferred { .. })
                    | Ok(PollOutcome::Held { .. }) => Some(self.policy.retry_delay),
                    Ok(PollOutcome::Completed { .. })
                    | Ok(PollOutcome::Failed { .. })
                    | Ok(PollOutcome::Contended { .. }) => None,
                    Err(e) => {
                        error!(error = %e, "Worker error, backing off");
                        store_failed = true;
                        Some(self.policy.error_backoff)
                    }
                };

                if let Some(pause) = pause {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(pause) => {}
                    }
                }

                // The claimed job may be stranded in the in-progress state.
                if store_failed {
                    self.recover_logged();
                }
            }

            info!("Worker stopped");
        }
        .instrument(span)
        .await;

        name
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

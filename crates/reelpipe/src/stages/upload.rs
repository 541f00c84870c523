use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{Local, Utc};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::rate_limit::RateLimiter;
use super::{existing_input, missing_input};
use crate::collaborators::Publisher;
use crate::config::UploadConfig;
use crate::error::StageError;
use crate::job::{Job, JobUpdate};
use crate::worker::{StageDescriptor, StageOutcome, StageProcessor};

/// Publishes approved jobs, paced by a daily cap and a randomized spacing.
pub struct UploadStage {
    publisher: Arc<dyn Publisher>,
    config: UploadConfig,
    limiter: RateLimiter,
    cancel: CancellationToken,
}

impl UploadStage {
    pub fn new(publisher: Arc<dyn Publisher>, config: UploadConfig, cancel: CancellationToken) -> Self {
        let limiter = RateLimiter::new(config.max_per_day, config.min_delay());
        Self {
            publisher,
            config,
            limiter,
            cancel,
        }
    }

    #[cfg(test)]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn blocked(&self) -> Option<String> {
        if !self.config.enabled {
            return Some("Uploads are disabled".to_string());
        }
        self.limiter
            .check(Instant::now(), Local::now().date_naive())
            .err()
            .map(|deferral| deferral.to_string())
    }

    /// How long to wait before the next publish: a spacing drawn from
    /// [min delay, max delay] minus the time already passed since the last
    /// publish. Zero before the first publish.
    fn jitter_wait(&self, now: Instant) -> Duration {
        let Some(elapsed) = self.limiter.since_last(now) else {
            return Duration::ZERO;
        };
        let min = self.config.min_delay().as_secs();
        let max = self.config.max_delay().as_secs();
        let (low, high) = (min.min(max), min.max(max));
        let spacing = Duration::from_secs(rand::thread_rng().gen_range(low..=high));
        spacing.saturating_sub(elapsed)
    }
}

#[async_trait]
impl StageProcessor for UploadStage {
    fn descriptor(&self) -> StageDescriptor {
        StageDescriptor::UPLOAD
    }

    fn hold(&self) -> Option<String> {
        self.blocked()
    }

    async fn process(&self, job: &Job) -> Result<StageOutcome, StageError> {
        if let Some(reason) = self.blocked() {
            info!(job_id = job.id, reason = %reason, "Upload postponed");
            return Ok(StageOutcome::Deferred(reason));
        }

        let Some(artifact) = existing_input(job.final_path.as_deref()) else {
            return Ok(missing_input(job, "final video"));
        };

        let wait = self.jitter_wait(Instant::now());
        if !wait.is_zero() {
            info!(job_id = job.id, wait_secs = wait.as_secs(), "Waiting before publish");
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Ok(StageOutcome::Deferred(
                        "Shutdown requested before publish".to_string(),
                    ));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let receipt = self.publisher.publish(job, &artifact).await?;
        self.limiter.record(Instant::now(), Local::now().date_naive());

        info!(
            job_id = job.id,
            video_id = %receipt.external_id,
            published_today = self.limiter.published_today(),
            "Published"
        );

        Ok(StageOutcome::Completed(
            JobUpdate::new().published(Utc::now(), receipt.external_id, receipt.external_url),
        ))
    }
}

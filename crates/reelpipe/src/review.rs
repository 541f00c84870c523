//! Operator actions on jobs waiting for a human decision.
//!
//! Each action is a conditional transition: it applies only if the job is
//! still in the state the operator saw.

use chrono::Utc;
use tracing::info;

use crate::error::ReviewError;
use crate::job::{Job, JobState, JobUpdate};
use crate::store::{JobStore, Transition};

/// Clears the publish gate: `READY_FOR_REVIEW -> APPROVED`.
pub fn approve(
    store: &JobStore,
    id: i64,
    reviewer: &str,
    notes: Option<&str>,
) -> Result<Job, ReviewError> {
    let update = JobUpdate::new().reviewed(Utc::now(), reviewer, notes.map(str::to_string));
    let job = apply(store, id, JobState::ReadyForReview, JobState::Approved, None, &update)?;
    info!(job_id = id, reviewer, "Job approved");
    Ok(job)
}

/// `READY_FOR_REVIEW -> REJECTED`. Terminal.
pub fn reject(
    store: &JobStore,
    id: i64,
    reviewer: &str,
    notes: Option<&str>,
) -> Result<Job, ReviewError> {
    let update = JobUpdate::new().reviewed(Utc::now(), reviewer, notes.map(str::to_string));
    let job = apply(store, id, JobState::ReadyForReview, JobState::Rejected, None, &update)?;
    info!(job_id = id, reviewer, "Job rejected");
    Ok(job)
}

/// Sends a reviewed job through the pipeline again from the start.
pub fn send_back(store: &JobStore, id: i64, notes: Option<&str>) -> Result<Job, ReviewError> {
    let mut update = JobUpdate::new().retry_count(0).progress(0.0);
    if let Some(notes) = notes {
        update = update.review_notes(notes);
    }
    let job = apply(store, id, JobState::ReadyForReview, JobState::New, None, &update)?;
    info!(job_id = id, "Job sent back for rework");
    Ok(job)
}

/// Re-queues a failed job: `FAILED -> NEW` with retries and error cleared.
pub fn requeue_failed(store: &JobStore, id: i64) -> Result<Job, ReviewError> {
    let update = JobUpdate::new().retry_count(0).progress(0.0).clear_error();
    let job = apply(store, id, JobState::Failed, JobState::New, None, &update)?;
    info!(job_id = id, "Failed job re-queued");
    Ok(job)
}

fn apply(
    store: &JobStore,
    id: i64,
    expected: JobState,
    new_state: JobState,
    error_message: Option<&str>,
    update: &JobUpdate,
) -> Result<Job, ReviewError> {
    match store.compare_and_transition(id, expected, new_state, error_message, update)? {
        Transition::Applied(job) => Ok(job),
        Transition::NotFound => Err(ReviewError::NotFound(id)),
        Transition::StateMismatch(actual) => Err(ReviewError::InvalidState {
            id,
            expected,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{actions, NewJob, SourceKind};

    fn job_in(store: &JobStore, state: JobState) -> Job {
        let job = store
            .create_job(&NewJob::from_file(SourceKind::Clip, "a.mp4"))
            .unwrap();
        store
            .update_job_state(job.id, state, None, &JobUpdate::new())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_approve_records_reviewer() {
        let store = JobStore::open_in_memory().unwrap();
        let job = job_in(&store, JobState::ReadyForReview);

        let approved = approve(&store, job.id, "dana", Some("looks good")).unwrap();
        assert_eq!(approved.state, JobState::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("dana"));
        assert_eq!(approved.review_notes.as_deref(), Some("looks good"));
        assert!(approved.reviewed_at.is_some());
    }

    #[test]
    fn test_reject_is_terminal() {
        let store = JobStore::open_in_memory().unwrap();
        let job = job_in(&store, JobState::ReadyForReview);

        let rejected = reject(&store, job.id, "dana", None).unwrap();
        assert_eq!(rejected.state, JobState::Rejected);
        assert!(rejected.state.is_terminal());
    }

    #[test]
    fn test_wrong_state_is_rejected() {
        let store = JobStore::open_in_memory().unwrap();
        let job = job_in(&store, JobState::Cutting);

        match approve(&store, job.id, "dana", None) {
            Err(ReviewError::InvalidState {
                expected, actual, ..
            }) => {
                assert_eq!(expected, JobState::ReadyForReview);
                assert_eq!(actual, JobState::Cutting);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.get_job(job.id).unwrap().unwrap().state, JobState::Cutting);
    }

    #[test]
    fn test_unknown_job() {
        let store = JobStore::open_in_memory().unwrap();
        assert!(matches!(
            requeue_failed(&store, 404),
            Err(ReviewError::NotFound(404))
        ));
    }

    #[test]
    fn test_send_back_restarts_pipeline() {
        let store = JobStore::open_in_memory().unwrap();
        let job = job_in(&store, JobState::ReadyForReview);

        let job = send_back(&store, job.id, Some("tighter cut")).unwrap();
        assert_eq!(job.state, JobState::New);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.review_notes.as_deref(), Some("tighter cut"));
    }

    #[test]
    fn test_requeue_clears_failure() {
        let store = JobStore::open_in_memory().unwrap();
        let job = job_in(&store, JobState::Cutting);
        store
            .update_job_state(
                job.id,
                JobState::Failed,
                Some("renderer crashed"),
                &JobUpdate::new().retry_count(3),
            )
            .unwrap();

        let job = requeue_failed(&store, job.id).unwrap();
        assert_eq!(job.state, JobState::New);
        assert_eq!(job.retry_count, 0);
        assert_eq!(job.error_message, None);

        // cutting, failed, requeued
        assert_eq!(store.count_activity(Some(job.id), actions::STATE_CHANGE).unwrap(), 3);
    }
}

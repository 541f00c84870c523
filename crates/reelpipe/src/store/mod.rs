//! Durable job store: the single source of truth for job state.
//!
//! Every state transition and its `STATE_CHANGE` audit entry are written in
//! one SQLite transaction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::db::activity_repo::{self, ActivityRow};
use crate::db::job_repo::{self, Assignments, JobRow, NewJobRow};
use crate::db::{format_timestamp, idea_repo, parse_timestamp, Database, DatabaseError};
use crate::job::{actions, ActivityEntry, Job, JobState, JobStats, JobUpdate, NewJob, SourceKind};

/// Result of a conditional transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The transition was written; carries the job as stored afterwards.
    Applied(Job),
    NotFound,
    /// The job was not in the expected state; carries the state it was in.
    StateMismatch(JobState),
}

impl Transition {
    pub fn into_job(self) -> Option<Job> {
        match self {
            Transition::Applied(job) => Some(job),
            Transition::NotFound | Transition::StateMismatch(_) => None,
        }
    }
}

/// Handle to the job and activity tables. Cloning shares the connection.
#[derive(Clone)]
pub struct JobStore {
    db: Database,
}

impl JobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens the database at `path` and runs migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // ─── Creation ───────────────────────────────────────────────────────────

    /// Inserts a job in `NEW` and writes its `JOB_CREATED` entry.
    pub fn create_job(&self, new_job: &NewJob) -> Result<Job, DatabaseError> {
        let job = self.db.with_tx(|conn| insert_job(conn, new_job, &Utc::now()))?;
        log::info!(
            "Created job {} ({}) from {}",
            job.id,
            job.source_kind,
            job.label()
        );
        Ok(job)
    }

    /// Creates an idea job unless the same idea text was ingested before.
    ///
    /// The job, its audit entry and the ingested-ideas record are written
    /// together. Returns `None` for an already-ingested idea.
    pub fn create_idea_job(&self, idea: &str) -> Result<Option<Job>, DatabaseError> {
        let created = self.db.with_tx(|conn| {
            if idea_repo::contains(conn, idea)? {
                return Ok(None);
            }
            let now = Utc::now();
            let job = insert_job(conn, &NewJob::from_idea(idea), &now)?;
            idea_repo::insert(conn, idea, job.id, &format_timestamp(&now))?;
            Ok(Some(job))
        })?;
        if let Some(job) = &created {
            log::info!("Created idea job {}: {}", job.id, job.label());
        }
        Ok(created)
    }

    pub fn is_idea_ingested(&self, idea: &str) -> Result<bool, DatabaseError> {
        self.db.with_conn(|conn| idea_repo::contains(conn, idea))
    }

    // ─── Transitions ────────────────────────────────────────────────────────

    /// Moves a job to `new_state`, applying `update` and an optional error
    /// message, and writes a `STATE_CHANGE` entry. Returns `None` if the job
    /// does not exist.
    pub fn update_job_state(
        &self,
        id: i64,
        new_state: JobState,
        error_message: Option<&str>,
        update: &JobUpdate,
    ) -> Result<Option<Job>, DatabaseError> {
        let outcome = self
            .db
            .with_tx(|conn| transition(conn, id, None, new_state, error_message, update))?;
        Ok(outcome.into_job())
    }

    /// Like `update_job_state`, but only if the job is still in `expected`.
    pub fn compare_and_transition(
        &self,
        id: i64,
        expected: JobState,
        new_state: JobState,
        error_message: Option<&str>,
        update: &JobUpdate,
    ) -> Result<Transition, DatabaseError> {
        self.db.with_tx(|conn| {
            transition(conn, id, Some(expected), new_state, error_message, update)
        })
    }

    /// Moves every job in `from` back to `to`. Used on worker start to
    /// recover claims interrupted by a crash. Returns the recovered ids.
    pub fn reset_in_progress(&self, from: JobState, to: JobState) -> Result<Vec<i64>, DatabaseError> {
        let update = JobUpdate::new().state_data(
            serde_json::json!({ "recovered_from": from.as_str() }).to_string(),
        );
        self.db.with_tx(|conn| {
            let mut recovered = Vec::new();
            for id in job_repo::find_ids_by_state(conn, from.as_str())? {
                if let Transition::Applied(_) =
                    transition(conn, id, Some(from), to, None, &update)?
                {
                    recovered.push(id);
                }
            }
            Ok(recovered)
        })
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn get_job(&self, id: i64) -> Result<Option<Job>, DatabaseError> {
        self.db.with_conn(|conn| {
            job_repo::find_by_id(conn, id)?
                .map(job_from_row)
                .transpose()
        })
    }

    /// Jobs in exactly `state`, oldest first, at most `limit`.
    pub fn get_jobs_by_state(&self, state: JobState, limit: u32) -> Result<Vec<Job>, DatabaseError> {
        self.db.with_conn(|conn| {
            job_repo::find_by_state(conn, state.as_str(), limit)?
                .into_iter()
                .map(job_from_row)
                .collect()
        })
    }

    /// All jobs, newest first.
    pub fn get_all_jobs(&self, limit: u32) -> Result<Vec<Job>, DatabaseError> {
        self.db.with_conn(|conn| {
            job_repo::find_all(conn, limit)?
                .into_iter()
                .map(job_from_row)
                .collect()
        })
    }

    /// Total and per-state counts. Every state is present, zero or not.
    pub fn get_stats(&self) -> Result<JobStats, DatabaseError> {
        let counts = self.db.with_conn(job_repo::count_by_state)?;

        let mut by_state: BTreeMap<JobState, u64> =
            JobState::ALL.iter().map(|s| (*s, 0)).collect();
        let mut total = 0;
        for (state, count) in counts {
            let parsed = state.parse::<JobState>().map_err(|reason| DatabaseError::InvalidRow {
                table: "jobs",
                id: 0,
                reason,
            })?;
            by_state.insert(parsed, count);
            total += count;
        }

        Ok(JobStats { total, by_state })
    }

    // ─── Activity log ───────────────────────────────────────────────────────

    /// Most recent entries first, optionally for a single job.
    pub fn get_activity_logs(
        &self,
        job_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ActivityEntry>, DatabaseError> {
        self.db.with_conn(|conn| {
            activity_repo::find_recent(conn, job_id, limit)?
                .into_iter()
                .map(activity_from_row)
                .collect()
        })
    }

    /// Appends an audit entry that is not tied to a transition.
    pub fn log_activity(
        &self,
        job_id: Option<i64>,
        action: &str,
        details: Option<&str>,
        success: bool,
    ) -> Result<(), DatabaseError> {
        let now = format_timestamp(&Utc::now());
        self.db.with_conn(|conn| {
            activity_repo::insert(conn, &now, job_id, action, details, success)?;
            Ok(())
        })
    }

    pub fn count_activity(&self, job_id: Option<i64>, action: &str) -> Result<u32, DatabaseError> {
        self.db
            .with_conn(|conn| activity_repo::count_action(conn, job_id, action))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn insert_job(conn: &Connection, new_job: &NewJob, now: &DateTime<Utc>) -> Result<Job, DatabaseError> {
    let now = format_timestamp(now);
    let source_path = new_job.source_path.as_deref().map(path_text);
    let original_path = new_job.original_path.as_deref().map(path_text);

    let id = job_repo::insert(
        conn,
        &NewJobRow {
            source_kind: new_job.source_kind.as_str(),
            source_path: source_path.as_deref(),
            source_idea: new_job.source_idea.as_deref(),
            original_path: original_path.as_deref(),
            state: JobState::New.as_str(),
            now: &now,
        },
    )?;

    let details = format!("Created {} job", new_job.source_kind);
    activity_repo::insert(conn, &now, Some(id), actions::JOB_CREATED, Some(&details), true)?;

    let row = job_repo::find_by_id(conn, id)?.ok_or(DatabaseError::InvalidRow {
        table: "jobs",
        id,
        reason: "row vanished after insert".to_string(),
    })?;
    job_from_row(row)
}

fn transition(
    conn: &Connection,
    id: i64,
    expected: Option<JobState>,
    new_state: JobState,
    error_message: Option<&str>,
    update: &JobUpdate,
) -> Result<Transition, DatabaseError> {
    let Some(current) = job_repo::find_state(conn, id)? else {
        return Ok(Transition::NotFound);
    };
    let current = parse_state(&current, id)?;
    if let Some(expected) = expected {
        if current != expected {
            return Ok(Transition::StateMismatch(current));
        }
    }

    let now = format_timestamp(&Utc::now());
    let assignments = assignments_for(new_state, error_message, update, &now);
    let expected_text = expected.map(|s| s.as_str());
    if job_repo::update_fields(conn, id, &assignments, expected_text)? == 0 {
        return Ok(Transition::StateMismatch(current));
    }

    let mut details = format!("State changed from {} to {}", current, new_state);
    if let Some(error) = error_message {
        details.push_str(": ");
        details.push_str(error);
    }
    activity_repo::insert(
        conn,
        &now,
        Some(id),
        actions::STATE_CHANGE,
        Some(&details),
        new_state != JobState::Failed,
    )?;

    let row = job_repo::find_by_id(conn, id)?.ok_or(DatabaseError::InvalidRow {
        table: "jobs",
        id,
        reason: "row vanished during transition".to_string(),
    })?;
    Ok(Transition::Applied(job_from_row(row)?))
}

fn assignments_for(
    new_state: JobState,
    error_message: Option<&str>,
    update: &JobUpdate,
    now: &str,
) -> Assignments {
    let mut set = Assignments::new();
    set.set("state", new_state.as_str().to_string())
        .set("updated_at", now.to_string());

    if let Some(error) = error_message {
        set.set("error_message", Some(error.to_string()));
    } else if update.clear_error {
        set.set("error_message", None::<String>);
    }

    if let Some(data) = &update.state_data {
        set.set("state_data", data.clone());
    }
    if let Some(progress) = update.progress {
        set.set("progress", progress);
    }
    if let Some(count) = update.retry_count {
        set.set("retry_count", count);
    }

    let paths: [(&'static str, &Option<PathBuf>); 7] = [
        ("original_path", &update.original_path),
        ("cut_path", &update.cut_path),
        ("formatted_path", &update.formatted_path),
        ("captioned_path", &update.captioned_path),
        ("final_path", &update.final_path),
        ("caption_file", &update.caption_file),
        ("metadata_file", &update.metadata_file),
    ];
    for (column, path) in paths {
        if let Some(path) = path {
            set.set(column, path_text(path));
        }
    }

    let texts: [(&'static str, &Option<String>); 7] = [
        ("title", &update.title),
        ("description", &update.description),
        ("hashtags", &update.hashtags),
        ("reviewed_by", &update.reviewed_by),
        ("review_notes", &update.review_notes),
        ("video_id", &update.video_id),
        ("video_url", &update.video_url),
    ];
    for (column, value) in texts {
        if let Some(value) = value {
            set.set(column, value.clone());
        }
    }

    if let Some(seconds) = update.duration_seconds {
        set.set("duration_seconds", seconds);
    }
    if let Some(at) = &update.reviewed_at {
        set.set("reviewed_at", format_timestamp(at));
    }
    if let Some(at) = &update.uploaded_at {
        set.set("uploaded_at", format_timestamp(at));
    }

    set
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn parse_state(raw: &str, id: i64) -> Result<JobState, DatabaseError> {
    raw.parse().map_err(|reason| DatabaseError::InvalidRow {
        table: "jobs",
        id,
        reason,
    })
}

fn parse_time(raw: &str, table: &'static str, id: i64) -> Result<DateTime<Utc>, DatabaseError> {
    parse_timestamp(raw).map_err(|e| DatabaseError::InvalidRow {
        table,
        id,
        reason: format!("bad timestamp '{}': {}", raw, e),
    })
}

fn parse_opt_time(
    raw: Option<&str>,
    table: &'static str,
    id: i64,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    raw.map(|r| parse_time(r, table, id)).transpose()
}

fn job_from_row(row: JobRow) -> Result<Job, DatabaseError> {
    let id = row.id;
    let source_kind = row
        .source_kind
        .parse::<SourceKind>()
        .map_err(|reason| DatabaseError::InvalidRow {
            table: "jobs",
            id,
            reason,
        })?;
    let retry_count = u32::try_from(row.retry_count).map_err(|_| DatabaseError::InvalidRow {
        table: "jobs",
        id,
        reason: format!("negative retry_count {}", row.retry_count),
    })?;

    Ok(Job {
        id,
        created_at: parse_time(&row.created_at, "jobs", id)?,
        updated_at: parse_time(&row.updated_at, "jobs", id)?,
        source_kind,
        source_path: row.source_path.map(PathBuf::from),
        source_idea: row.source_idea,
        state: parse_state(&row.state, id)?,
        state_data: row.state_data,
        progress: row.progress,
        error_message: row.error_message,
        retry_count,
        original_path: row.original_path.map(PathBuf::from),
        cut_path: row.cut_path.map(PathBuf::from),
        formatted_path: row.formatted_path.map(PathBuf::from),
        captioned_path: row.captioned_path.map(PathBuf::from),
        final_path: row.final_path.map(PathBuf::from),
        caption_file: row.caption_file.map(PathBuf::from),
        metadata_file: row.metadata_file.map(PathBuf::from),
        title: row.title,
        description: row.description,
        hashtags: row.hashtags,
        duration_seconds: row.duration_seconds,
        reviewed_at: parse_opt_time(row.reviewed_at.as_deref(), "jobs", id)?,
        reviewed_by: row.reviewed_by,
        review_notes: row.review_notes,
        uploaded_at: parse_opt_time(row.uploaded_at.as_deref(), "jobs", id)?,
        video_id: row.video_id,
        video_url: row.video_url,
    })
}

fn activity_from_row(row: ActivityRow) -> Result<ActivityEntry, DatabaseError> {
    Ok(ActivityEntry {
        id: row.id,
        timestamp: parse_time(&row.timestamp, "activity_logs", row.id)?,
        job_id: row.job_id,
        action: row.action,
        details: row.details,
        success: row.success,
    })
}

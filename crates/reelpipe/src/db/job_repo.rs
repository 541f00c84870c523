//! Job repository: row-level SQL for the `jobs` table.

use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;

/// A raw job row from the database.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub source_kind: String,
    pub source_path: Option<String>,
    pub source_idea: Option<String>,
    pub state: String,
    pub state_data: Option<String>,
    pub progress: f64,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub original_path: Option<String>,
    pub cut_path: Option<String>,
    pub formatted_path: Option<String>,
    pub captioned_path: Option<String>,
    pub final_path: Option<String>,
    pub caption_file: Option<String>,
    pub metadata_file: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub hashtags: Option<String>,
    pub duration_seconds: Option<f64>,
    pub reviewed_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub review_notes: Option<String>,
    pub uploaded_at: Option<String>,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            source_kind: row.get("source_kind")?,
            source_path: row.get("source_path")?,
            source_idea: row.get("source_idea")?,
            state: row.get("state")?,
            state_data: row.get("state_data")?,
            progress: row.get("progress")?,
            error_message: row.get("error_message")?,
            retry_count: row.get("retry_count")?,
            original_path: row.get("original_path")?,
            cut_path: row.get("cut_path")?,
            formatted_path: row.get("formatted_path")?,
            captioned_path: row.get("captioned_path")?,
            final_path: row.get("final_path")?,
            caption_file: row.get("caption_file")?,
            metadata_file: row.get("metadata_file")?,
            title: row.get("title")?,
            description: row.get("description")?,
            hashtags: row.get("hashtags")?,
            duration_seconds: row.get("duration_seconds")?,
            reviewed_at: row.get("reviewed_at")?,
            reviewed_by: row.get("reviewed_by")?,
            review_notes: row.get("review_notes")?,
            uploaded_at: row.get("uploaded_at")?,
            video_id: row.get("video_id")?,
            video_url: row.get("video_url")?,
        })
    }
}

/// Column values for a freshly created job.
#[derive(Debug, Clone)]
pub struct NewJobRow<'a> {
    pub source_kind: &'a str,
    pub source_path: Option<&'a str>,
    pub source_idea: Option<&'a str>,
    pub original_path: Option<&'a str>,
    pub state: &'a str,
    pub now: &'a str,
}

/// Column assignments for an UPDATE, built up one column at a time.
#[derive(Default)]
pub struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: ToSql + 'static>(&mut self, column: &'static str, value: V) -> &mut Self {
        self.columns.push(column);
        self.values.push(Box::new(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| *c == column)
    }
}

/// Inserts a new job row and returns its id.
pub fn insert(conn: &Connection, job: &NewJobRow<'_>) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO jobs (created_at, updated_at, source_kind, source_path, source_idea,
         original_path, state, progress, retry_count)
         VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, 0, 0)",
        params![
            job.now,
            job.source_kind,
            job.source_path,
            job.source_idea,
            job.original_path,
            job.state,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Finds a job by its ID.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<JobRow>, DatabaseError> {
    let row = conn
        .query_row("SELECT * FROM jobs WHERE id = ?1", params![id], JobRow::from_row)
        .optional()?;
    Ok(row)
}

/// Returns the current state text of a job without loading the whole row.
pub fn find_state(conn: &Connection, id: i64) -> Result<Option<String>, DatabaseError> {
    let state = conn
        .query_row("SELECT state FROM jobs WHERE id = ?1", params![id], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(state)
}

/// Jobs in exactly `state`, oldest first.
pub fn find_by_state(
    conn: &Connection,
    state: &str,
    limit: u32,
) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM jobs WHERE state = ?1 ORDER BY created_at ASC, id ASC LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![state, limit], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Ids of every job in `state`.
pub fn find_ids_by_state(conn: &Connection, state: &str) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT id FROM jobs WHERE state = ?1 ORDER BY id ASC")?;
    let ids = stmt
        .query_map(params![state], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// All jobs, newest first.
pub fn find_all(conn: &Connection, limit: u32) -> Result<Vec<JobRow>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT * FROM jobs ORDER BY created_at DESC, id DESC LIMIT ?1")?;
    let rows = stmt
        .query_map(params![limit], JobRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Returns (state, count) pairs for every state present in the table.
pub fn count_by_state(conn: &Connection) -> Result<Vec<(String, u64)>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
    let counts = stmt
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(counts
        .into_iter()
        .map(|(state, count)| (state, count.max(0) as u64))
        .collect())
}

/// Applies `assignments` to one job. When `expected_state` is given the
/// update only happens if the row is still in that state.
///
/// Returns the number of rows changed (0 or 1).
pub fn update_fields(
    conn: &Connection,
    id: i64,
    assignments: &Assignments,
    expected_state: Option<&str>,
) -> Result<usize, DatabaseError> {
    if assignments.is_empty() {
        return Ok(0);
    }

    let mut param_values: Vec<&dyn ToSql> = Vec::with_capacity(assignments.values.len() + 2);
    let set_clause = assignments
        .columns
        .iter()
        .zip(assignments.values.iter())
        .map(|(column, value)| {
            param_values.push(value.as_ref());
            format!("{} = ?{}", column, param_values.len())
        })
        .collect::<Vec<_>>()
        .join(", ");

    param_values.push(&id);
    let mut sql = format!(
        "UPDATE jobs SET {} WHERE id = ?{}",
        set_clause,
        param_values.len()
    );

    if let Some(expected) = expected_state.as_ref() {
        param_values.push(expected);
        sql.push_str(&format!(" AND state = ?{}", param_values.len()));
    }

    let changed = conn.execute(&sql, param_values.as_slice())?;
    Ok(changed)
}

//! Activity log repository: append-only audit rows.

use rusqlite::{params, Connection, Row};

use super::DatabaseError;

/// A raw activity log row.
#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub timestamp: String,
    pub job_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub success: bool,
}

impl ActivityRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            job_id: row.get("job_id")?,
            action: row.get("action")?,
            details: row.get("details")?,
            success: row.get("success")?,
        })
    }
}

/// Appends one entry and returns its id.
pub fn insert(
    conn: &Connection,
    timestamp: &str,
    job_id: Option<i64>,
    action: &str,
    details: Option<&str>,
    success: bool,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO activity_logs (timestamp, job_id, action, details, success)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![timestamp, job_id, action, details, success],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent entries first, optionally restricted to one job.
pub fn find_recent(
    conn: &Connection,
    job_id: Option<i64>,
    limit: u32,
) -> Result<Vec<ActivityRow>, DatabaseError> {
    let rows = match job_id {
        Some(job_id) => {
            let mut stmt = conn.prepare(
                "SELECT * FROM activity_logs WHERE job_id = ?1
                 ORDER BY timestamp DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![job_id, limit], ActivityRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn
                .prepare("SELECT * FROM activity_logs ORDER BY timestamp DESC, id DESC LIMIT ?1")?;
            let rows = stmt
                .query_map(params![limit], ActivityRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

/// Number of entries with `action`, optionally restricted to one job.
pub fn count_action(
    conn: &Connection,
    job_id: Option<i64>,
    action: &str,
) -> Result<u32, DatabaseError> {
    let count = match job_id {
        Some(job_id) => conn.query_row(
            "SELECT COUNT(*) FROM activity_logs WHERE job_id = ?1 AND action = ?2",
            params![job_id, action],
            |r| r.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM activity_logs WHERE action = ?1",
            params![action],
            |r| r.get(0),
        )?,
    };
    Ok(count)
}

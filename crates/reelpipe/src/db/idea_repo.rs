//! Persisted set of idea lines that have already been turned into jobs.

use rusqlite::{params, Connection};

use super::DatabaseError;

/// True if `idea` was ingested by any earlier pass.
pub fn contains(conn: &Connection, idea: &str) -> Result<bool, DatabaseError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM ingested_ideas WHERE idea = ?1",
        params![idea],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// Records `idea` as ingested. Returns false if it was already present.
pub fn insert(
    conn: &Connection,
    idea: &str,
    job_id: i64,
    ingested_at: &str,
) -> Result<bool, DatabaseError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO ingested_ideas (idea, job_id, ingested_at) VALUES (?1, ?2, ?3)",
        params![idea, job_id, ingested_at],
    )?;
    Ok(inserted == 1)
}

#[cfg(test)]
pub fn count(conn: &Connection) -> Result<u32, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM ingested_ideas", [], |r| r.get(0))?;
    Ok(count)
}

use anyhow::{anyhow, Result};
use reelpipe::{Config, JobState};

use super::{open_store, print_json};

pub fn jobs(config: &Config, state: Option<JobState>, limit: u32) -> Result<()> {
    let store = open_store(config)?;
    let jobs = match state {
        Some(state) => store.get_jobs_by_state(state, limit)?,
        None => store.get_all_jobs(limit)?,
    };
    print_json(&jobs)
}

pub fn show(config: &Config, id: i64) -> Result<()> {
    let store = open_store(config)?;
    let job = store
        .get_job(id)?
        .ok_or_else(|| anyhow!("Job {} not found", id))?;
    print_json(&job)
}

pub fn stats(config: &Config) -> Result<()> {
    print_json(&open_store(config)?.get_stats()?)
}

pub fn logs(config: &Config, job: Option<i64>, limit: u32) -> Result<()> {
    print_json(&open_store(config)?.get_activity_logs(job, limit)?)
}

use anyhow::Result;
use reelpipe::{review, Config};

use super::{open_store, print_json};

pub fn approve(config: &Config, id: i64, reviewer: &str, notes: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    print_json(&review::approve(&store, id, reviewer, notes)?)
}

pub fn reject(config: &Config, id: i64, reviewer: &str, notes: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    print_json(&review::reject(&store, id, reviewer, notes)?)
}

pub fn send_back(config: &Config, id: i64, notes: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    print_json(&review::send_back(&store, id, notes)?)
}

pub fn requeue(config: &Config, id: i64) -> Result<()> {
    let store = open_store(config)?;
    print_json(&review::requeue_failed(&store, id)?)
}

pub mod init;
pub mod inspect;
pub mod review;
pub mod run;

use std::path::Path;

use anyhow::{Context, Result};
use reelpipe::{Config, JobStore};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

pub fn load(path: &Path) -> Result<Config> {
    reelpipe::load_config(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

pub fn open_store(config: &Config) -> Result<JobStore> {
    JobStore::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database_path.display()
        )
    })
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", body);
    Ok(())
}

/// A token cancelled on SIGINT or SIGTERM.
pub fn shutdown_token() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        handler_token.cancel();
    })
    .context("Failed to install signal handler")?;
    Ok(token)
}

use anyhow::{Context, Result};
use reelpipe::{Collaborators, Config, InboxWatcher, WorkerManager};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{open_store, shutdown_token};

pub async fn watch(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let token = shutdown_token()?;
    let watcher = spawn_watcher(InboxWatcher::from_config(&config, store), token);
    join_watcher(watcher).await
}

pub async fn workers(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let token = shutdown_token()?;

    let manager = WorkerManager::from_config(store, &config, Collaborators::default());
    manager.start();

    token.cancelled().await;
    manager.shutdown().await;
    Ok(())
}

/// Watcher and workers in one process. The watcher stops with the workers.
pub async fn run_all(config: Config) -> Result<()> {
    let store = open_store(&config)?;
    let token = shutdown_token()?;

    let manager = WorkerManager::from_config(store.clone(), &config, Collaborators::default());
    let watcher = spawn_watcher(
        InboxWatcher::from_config(&config, store),
        manager.child_token(),
    );
    manager.start();
    info!(stages = ?manager.stage_names(), "Pipeline running");

    token.cancelled().await;
    manager.shutdown().await;
    join_watcher(watcher).await
}

fn spawn_watcher(
    watcher: InboxWatcher,
    token: CancellationToken,
) -> JoinHandle<reelpipe::error::Result<()>> {
    tokio::task::spawn_blocking(move || watcher.watch(token).map_err(Into::into))
}

async fn join_watcher(handle: JoinHandle<reelpipe::error::Result<()>>) -> Result<()> {
    handle
        .await
        .context("Inbox watcher task failed")?
        .context("Inbox watcher stopped with an error")
}

use std::path::Path;

use anyhow::{Context, Result};
use reelpipe::{ArtifactStorage, InboxWatcher};
use serde_json::json;
use tracing::info;

use super::{load, open_store, print_json};

pub fn run(config_path: &Path, force: bool) -> Result<()> {
    let config = if force || !config_path.exists() {
        let config = reelpipe::config::save_default_config(config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        info!(path = %config_path.display(), "Wrote default config");
        config
    } else {
        load(config_path)?
    };

    let store = open_store(&config)?;
    ArtifactStorage::new(config.storage.clone())
        .prepare()
        .context("Failed to create storage directories")?;
    InboxWatcher::from_config(&config, store)
        .prepare()
        .context("Failed to create inbox")?;

    print_json(&json!({
        "config": config_path,
        "database": config.database_path,
        "inbox": {
            "longVideos": config.inbox.long_videos,
            "clips": config.inbox.clips,
            "ideas": config.inbox.ideas,
        },
    }))
}

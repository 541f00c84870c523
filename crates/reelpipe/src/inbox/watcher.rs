use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ideas::{ensure_ideas_file, idea_lines, read_ideas_file};
use crate::config::{Config, InboxConfig};
use crate::error::InboxError;
use crate::job::{Job, NewJob, SourceKind};
use crate::storage::filesystem::ensure_directory;
use crate::storage::ArtifactStorage;
use crate::store::JobStore;

const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "wmv", "flv", "webm"];

/// Suffixes of files that are still being downloaded.
const PARTIAL_SUFFIXES: &[&str] = &[".tmp", ".part", ".crdownload"];

pub fn is_media_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let lower = name.to_ascii_lowercase();
    if PARTIAL_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Turns files dropped into the inbox into pipeline jobs.
pub struct InboxWatcher {
    config: InboxConfig,
    storage: ArtifactStorage,
    store: JobStore,
    /// Paths already ingested by this watcher.
    processed: Mutex<HashSet<PathBuf>>,
}

impl InboxWatcher {
    pub fn new(config: InboxConfig, storage: ArtifactStorage, store: JobStore) -> Self {
        Self {
            config,
            storage,
            store,
            processed: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &Config, store: JobStore) -> Self {
        Self::new(
            config.inbox.clone(),
            ArtifactStorage::new(config.storage.clone()),
            store,
        )
    }

    /// Creates the drop directories and the ideas file.
    pub fn prepare(&self) -> Result<(), InboxError> {
        ensure_directory(&self.config.long_videos)?;
        ensure_directory(&self.config.clips)?;
        if ensure_ideas_file(&self.config.ideas)? {
            info!(path = %self.config.ideas.display(), "Created ideas file");
        }
        self.storage.prepare()?;
        Ok(())
    }

    /// The source kind implied by the directory a file landed in.
    pub fn classify(&self, path: &Path) -> Option<SourceKind> {
        let parent = path.parent()?;
        if same_path(parent, &self.config.long_videos) {
            Some(SourceKind::LongVideo)
        } else if same_path(parent, &self.config.clips) {
            Some(SourceKind::Clip)
        } else {
            None
        }
    }

    /// Handles one file event. Returns the created job, or `None` when the
    /// file is not something to ingest.
    pub fn handle_file(&self, path: &Path) -> Result<Option<Job>, InboxError> {
        let Some(kind) = self.classify(path) else {
            return Ok(None);
        };
        if !is_media_file(path) {
            debug!(path = %path.display(), "Ignoring non-media file");
            return Ok(None);
        }

        if !self.mark_processed(path) {
            return Ok(None);
        }

        // Let the writer finish before copying.
        std::thread::sleep(self.config.settle_delay());
        if !path.is_file() {
            self.unmark(path);
            return Ok(None);
        }

        match self.ingest_file(path, kind) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                self.unmark(path);
                Err(e)
            }
        }
    }

    /// Copies `path` into durable storage and creates its job.
    pub fn ingest_file(&self, path: &Path, kind: SourceKind) -> Result<Job, InboxError> {
        let original = self.storage.store_original(path)?;
        let job = self
            .store
            .create_job(&NewJob::from_file(kind, path).with_original_path(&original))?;
        info!(
            job_id = job.id,
            kind = %kind,
            source = %path.display(),
            "Ingested file"
        );
        Ok(job)
    }

    /// Creates a job for every idea line not seen before.
    pub fn ingest_ideas(&self) -> Result<Vec<Job>, InboxError> {
        let text = read_ideas_file(&self.config.ideas)?;
        let mut created = Vec::new();
        for idea in idea_lines(&text) {
            if let Some(job) = self.store.create_idea_job(idea)? {
                info!(job_id = job.id, "Ingested idea");
                created.push(job);
            }
        }
        Ok(created)
    }

    /// Watches the inbox until `token` is cancelled. Blocking; run it on a
    /// dedicated thread.
    pub fn watch(&self, token: CancellationToken) -> Result<(), InboxError> {
        self.prepare()?;

        if let Err(e) = self.ingest_ideas() {
            error!(error = %e, "Initial ideas pass failed");
        }

        // Polling works on network and container mounts.
        let poll_config = NotifyConfig::default().with_poll_interval(self.config.poll_interval());
        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)?;

        for dir in [&self.config.long_videos, &self.config.clips] {
            debouncer.watcher().watch(dir, RecursiveMode::NonRecursive)?;
        }
        debouncer
            .watcher()
            .watch(&self.config.ideas, RecursiveMode::NonRecursive)?;

        info!(
            long_videos = %self.config.long_videos.display(),
            clips = %self.config.clips.display(),
            ideas = %self.config.ideas.display(),
            "Watching inbox"
        );

        loop {
            if token.is_cancelled() {
                info!("Inbox watcher shutting down");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if !matches!(event.kind, DebouncedEventKind::Any) {
                            continue;
                        }
                        self.dispatch(&event.path);
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {:?}", e),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }

    fn dispatch(&self, path: &Path) {
        if same_path(path, &self.config.ideas) {
            match self.ingest_ideas() {
                Ok(jobs) if !jobs.is_empty() => info!(count = jobs.len(), "New ideas ingested"),
                Ok(_) => {}
                Err(e) => error!(error = %e, "Failed to ingest ideas"),
            }
            return;
        }

        if path.is_dir() {
            return;
        }
        if let Err(e) = self.handle_file(path) {
            error!(path = %path.display(), error = %e, "Failed to ingest file");
        }
    }

    fn mark_processed(&self, path: &Path) -> bool {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf())
    }

    fn unmark(&self, path: &Path) {
        self.processed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }
}

/// Compares two paths, resolving them when both exist.
fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::job::JobState;
    use tempfile::TempDir;

    fn watcher(root: &Path) -> (InboxWatcher, JobStore) {
        let store = JobStore::open_in_memory().unwrap();
        let inbox = InboxConfig {
            long_videos: root.join("INBOX").join("long_videos"),
            clips: root.join("INBOX").join("clips"),
            ideas: root.join("INBOX").join("ideas.txt"),
            settle_millis: 0,
            poll_interval_secs: 1,
        };
        let storage = ArtifactStorage::new(StorageConfig {
            originals: root.join("storage").join("originals"),
            intermediate: root.join("storage").join("intermediate"),
            finals: root.join("storage").join("finals"),
            captions: root.join("storage").join("captions"),
            metadata: root.join("storage").join("metadata"),
        });
        let watcher = InboxWatcher::new(inbox, storage, store.clone());
        watcher.prepare().unwrap();
        (watcher, store)
    }

    #[test]
    fn test_media_extensions() {
        assert!(is_media_file(Path::new("a.mp4")));
        assert!(is_media_file(Path::new("b.MOV")));
        assert!(is_media_file(Path::new("c.webm")));
        assert!(!is_media_file(Path::new("notes.txt")));
        assert!(!is_media_file(Path::new("a.mp4.part")));
        assert!(!is_media_file(Path::new("a.mp4.crdownload")));
        assert!(!is_media_file(Path::new("noext")));
    }

    #[test]
    fn test_prepare_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        watcher(temp_dir.path());
        assert!(temp_dir.path().join("INBOX/long_videos").is_dir());
        assert!(temp_dir.path().join("INBOX/clips").is_dir());
        assert!(temp_dir.path().join("INBOX/ideas.txt").is_file());
        assert!(temp_dir.path().join("storage/originals").is_dir());
    }

    #[test]
    fn test_classify_by_directory() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, _) = watcher(temp_dir.path());
        let root = temp_dir.path();
        assert_eq!(
            watcher.classify(&root.join("INBOX/long_videos/x.mp4")),
            Some(SourceKind::LongVideo)
        );
        assert_eq!(
            watcher.classify(&root.join("INBOX/clips/x.mp4")),
            Some(SourceKind::Clip)
        );
        assert_eq!(watcher.classify(&root.join("elsewhere/x.mp4")), None);
    }

    #[test]
    fn test_handle_file_creates_job_once() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, store) = watcher(temp_dir.path());
        let clip = temp_dir.path().join("INBOX/clips/funny.mp4");
        std::fs::write(&clip, b"frames").unwrap();

        let job = watcher.handle_file(&clip).unwrap().unwrap();
        assert_eq!(job.state, JobState::New);
        assert_eq!(job.source_kind, SourceKind::Clip);
        assert_eq!(job.source_path.as_deref(), Some(clip.as_path()));
        let original = job.original_path.clone().unwrap();
        assert!(original.ends_with("originals/funny.mp4"));
        assert_eq!(std::fs::read(&original).unwrap(), b"frames");

        // A repeated event for the same file is ignored.
        assert!(watcher.handle_file(&clip).unwrap().is_none());
        assert_eq!(store.get_all_jobs(10).unwrap().len(), 1);
    }

    #[test]
    fn test_handle_file_ignores_non_media() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, store) = watcher(temp_dir.path());
        let notes = temp_dir.path().join("INBOX/clips/notes.txt");
        std::fs::write(&notes, b"text").unwrap();

        assert!(watcher.handle_file(&notes).unwrap().is_none());
        assert!(store.get_all_jobs(10).unwrap().is_empty());
    }

    #[test]
    fn test_same_name_in_both_drops_gets_distinct_originals() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, _) = watcher(temp_dir.path());
        let long = temp_dir.path().join("INBOX/long_videos/talk.mp4");
        let clip = temp_dir.path().join("INBOX/clips/talk.mp4");
        std::fs::write(&long, b"long").unwrap();
        std::fs::write(&clip, b"clip").unwrap();

        let first = watcher.handle_file(&long).unwrap().unwrap();
        let second = watcher.handle_file(&clip).unwrap().unwrap();
        assert_eq!(first.source_kind, SourceKind::LongVideo);
        assert!(first.original_path.unwrap().ends_with("talk.mp4"));
        assert!(second.original_path.unwrap().ends_with("talk_1.mp4"));
    }

    #[test]
    fn test_ideas_are_ingested_once() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, store) = watcher(temp_dir.path());
        let ideas = temp_dir.path().join("INBOX/ideas.txt");

        std::fs::write(&ideas, "# comment\nabc\n\nabc\n").unwrap();
        let first = watcher.ingest_ideas().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].source_idea.as_deref(), Some("abc"));

        std::fs::write(&ideas, "abc\ndef\n").unwrap();
        let second = watcher.ingest_ideas().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].source_idea.as_deref(), Some("def"));

        assert_eq!(store.get_all_jobs(10).unwrap().len(), 2);
    }

    #[test]
    fn test_watch_returns_when_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let (watcher, store) = watcher(temp_dir.path());
        std::fs::write(temp_dir.path().join("INBOX/ideas.txt"), "startup idea\n").unwrap();

        let token = CancellationToken::new();
        token.cancel();
        watcher.watch(token).unwrap();

        // The startup ideas pass runs even when cancelled right away.
        let jobs = store.get_all_jobs(10).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source_idea.as_deref(), Some("startup idea"));
    }
}

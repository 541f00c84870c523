//! Drop-folder and ideas-list intake.

pub mod ideas;
pub mod watcher;

pub use watcher::{is_media_file, InboxWatcher};

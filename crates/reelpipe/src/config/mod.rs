pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, save_default_config, validate_config};
pub use schema::{Config, InboxConfig, StorageConfig, UploadConfig, WorkerConfig};

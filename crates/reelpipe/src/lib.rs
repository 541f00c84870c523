pub mod collaborators;
pub mod config;
pub mod db;
pub mod error;
pub mod inbox;
pub mod job;
pub mod logging;
pub mod review;
pub mod stages;
pub mod storage;
pub mod store;
pub mod worker;

pub use collaborators::{
    Collaborators, ContentGenerator, CopyRenderer, Publisher, Renderer, StubPublisher,
    TemplateContentGenerator,
};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{
    ConfigError, InboxError, ReelpipeError, Result, ReviewError, StageError, StorageError,
};
pub use inbox::InboxWatcher;
pub use job::{ActivityEntry, Job, JobState, JobStats, JobUpdate, NewJob, SourceKind};
pub use storage::ArtifactStorage;
pub use store::{JobStore, Transition};
pub use worker::{StageDescriptor, StageOutcome, StageProcessor, StageWorker, WorkerManager};

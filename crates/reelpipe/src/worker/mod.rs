pub mod engine;
pub mod manager;
pub mod stage;

pub use engine::{PollOutcome, RetryPolicy, StageWorker};
pub use manager::WorkerManager;
pub use stage::{StageDescriptor, StageOutcome, StageProcessor};

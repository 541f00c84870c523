//! Job domain types: states, records, field updates and audit entries.

pub mod model;
pub mod state;

pub use model::{actions, ActivityEntry, Job, JobStats, JobUpdate, NewJob};
pub use state::{JobState, SourceKind};

//! Shared test utilities for reelpipe integration tests.
//!
//! - `TestHarness` gives each test its own inbox, storage and database
//! - `builders` holds scripted collaborators

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;

pub mod marks;
pub mod roster;
pub mod submissions;
pub mod test_definitions;

use std::sync::Arc;

use thiserror::Error;

pub use marks::{InMemoryMarkStore, MarkStore, MarkUpsert};
pub use roster::{InMemoryRoster, Roster};
pub use submissions::{CreateOutcome, InMemorySubmissionStore, SubmissionStore};
pub use test_definitions::{InMemoryTestRepository, TestRepository};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate key: {0}")]
    Duplicate(String),
}

/// Backing stores handed to `AppState`.
#[derive(Clone)]
pub struct Stores {
    pub tests: Arc<dyn TestRepository>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub marks: Arc<dyn MarkStore>,
    pub roster: Arc<dyn Roster>,
}

impl Stores {
    pub fn in_memory(roster: Arc<dyn Roster>) -> Self {
        Self {
            tests: Arc::new(InMemoryTestRepository::default()),
            submissions: Arc::new(InMemorySubmissionStore::default()),
            marks: Arc::new(InMemoryMarkStore::default()),
            roster,
        }
    }
}

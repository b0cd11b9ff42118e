use std::sync::Arc;

use time::OffsetDateTime;

use crate::core::{clock::Clock, config::Settings};
use crate::repositories::{MarkStore, Roster, Stores, SubmissionStore, TestRepository};
use crate::sessions::registry::ActiveAttempts;

/// Shared handle to settings, clock, stores and live attempts. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    clock: Arc<dyn Clock>,
    stores: Stores,
    attempts: ActiveAttempts,
}

impl AppState {
    pub fn new(settings: Settings, clock: Arc<dyn Clock>, stores: Stores) -> Self {
        Self {
            inner: Arc::new(InnerState {
                settings,
                clock,
                stores,
                attempts: ActiveAttempts::default(),
            }),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn now(&self) -> OffsetDateTime {
        self.inner.clock.now()
    }

    pub fn tests(&self) -> &dyn TestRepository {
        self.inner.stores.tests.as_ref()
    }

    pub fn submissions(&self) -> &dyn SubmissionStore {
        self.inner.stores.submissions.as_ref()
    }

    pub fn marks(&self) -> &dyn MarkStore {
        self.inner.stores.marks.as_ref()
    }

    pub fn roster(&self) -> &dyn Roster {
        self.inner.stores.roster.as_ref()
    }

    /// Attempts currently held open in this process.
    pub fn live_attempts(&self) -> usize {
        self.inner.attempts.live_count()
    }

    #[cfg(test)]
    pub(crate) fn registered_attempts(&self) -> usize {
        self.inner.attempts.entry_count()
    }

    pub(crate) fn attempts(&self) -> &ActiveAttempts {
        &self.inner.attempts
    }
}

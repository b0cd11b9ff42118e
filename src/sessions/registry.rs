use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use super::session::SessionInner;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct AttemptKey {
    pub(crate) test_id: String,
    pub(crate) student_id: String,
}

impl AttemptKey {
    pub(crate) fn new(test_id: &str, student_id: &str) -> Self {
        Self { test_id: test_id.to_string(), student_id: student_id.to_string() }
    }
}

/// Live attempts of this process, keyed by (test, student). Entries are weak; a session
/// nobody holds is gone.
#[derive(Default)]
pub(crate) struct ActiveAttempts {
    sessions: Mutex<HashMap<AttemptKey, Weak<SessionInner>>>,
}

impl ActiveAttempts {
    pub(crate) fn get(&self, key: &AttemptKey) -> Option<Arc<SessionInner>> {
        let mut sessions = self.lock();
        match sessions.get(key).map(Weak::upgrade) {
            Some(Some(inner)) => Some(inner),
            Some(None) => {
                sessions.remove(key);
                None
            }
            None => None,
        }
    }

    /// Registers `candidate` unless a live session already holds the key; returns the winner.
    pub(crate) fn insert_or_get(
        &self,
        key: AttemptKey,
        candidate: Arc<SessionInner>,
    ) -> Arc<SessionInner> {
        let mut sessions = self.lock();
        if let Some(existing) = sessions.get(&key).and_then(Weak::upgrade) {
            return existing;
        }
        sessions.retain(|_, entry| entry.strong_count() > 0);
        sessions.insert(key, Arc::downgrade(&candidate));
        candidate
    }

    /// Drops the entry only if it still points at `inner`.
    pub(crate) fn remove(&self, key: &AttemptKey, inner: &SessionInner) {
        let mut sessions = self.lock();
        let same = sessions
            .get(key)
            .is_some_and(|entry| std::ptr::eq(entry.as_ptr(), inner as *const SessionInner));
        if same {
            sessions.remove(key);
        }
    }

    pub(crate) fn live_count(&self) -> usize {
        self.lock().values().filter(|entry| entry.strong_count() > 0).count()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AttemptKey, Weak<SessionInner>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

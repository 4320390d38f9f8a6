//! Command history buffer

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lines submitted in this session.
///
/// The caller that reads input appends to it; the `history` built-in lists
/// and edits it.
#[derive(Debug, Default)]
pub struct History {
    entries: Mutex<Vec<String>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing entries.
    pub fn with_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(entries.into_iter().map(Into::into).collect()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, line: impl Into<String>) {
        self.lock().push(line.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove the entry at 1-based `line`. Returns false when out of range.
    pub fn remove(&self, line: usize) -> bool {
        let mut entries = self.lock();
        if line == 0 || line > entries.len() {
            return false;
        }
        entries.remove(line - 1);
        true
    }
}

//! Session variable table

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Mutable variable table shared by every command of a session.
///
/// Locks are only held for the duration of a single call, never across a
/// suspension point, so a background job may observe the table between two
/// assignments of the foreground chain.
#[derive(Debug, Default)]
pub struct Environment {
    vars: RwLock<HashMap<String, String>>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment from name/value pairs.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: RwLock::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.vars.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.vars.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Value of a variable, if set.
    pub fn get(&self, name: &str) -> Option<String> {
        self.read().get(name).cloned()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write().insert(name.into(), value.into());
    }

    /// Remove a variable. Returns whether it was set.
    pub fn unset(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Whether a variable is set.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// All variables, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut vars: Vec<(String, String)> = self
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        vars.sort();
        vars
    }

    /// The `HOME` directory, empty when unset.
    pub fn home(&self) -> String {
        self.get("HOME").unwrap_or_default()
    }
}

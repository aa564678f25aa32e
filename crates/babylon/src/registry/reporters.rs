use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::normalize_callback;

// ============================================================================
// ReporterRegistration
// ============================================================================

/// A registered reporter. Reporters are broadcast to, never routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReporterRegistration {
    pub name: String,
    /// Base URL, always ending in `/`.
    pub callback: String,
    /// Receives every log entry as it is appended.
    pub live: bool,
}

impl ReporterRegistration {
    pub fn new(name: impl Into<String>, callback: &str, live: bool) -> Self {
        Self {
            name: name.into(),
            callback: normalize_callback(callback),
            live,
        }
    }

    /// `<callback>reporter/<lowercase name>/<path>`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}reporter/{}/{}",
            self.callback,
            self.name.to_lowercase(),
            path
        )
    }
}

// ============================================================================
// ReporterRegistry
// ============================================================================

#[derive(Default)]
pub struct ReporterRegistry {
    reporters: Mutex<HashMap<String, ReporterRegistration>>,
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<String, ReporterRegistration>> {
        self.reporters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite by name. Returns the replaced registration.
    pub fn add(&self, reporter: ReporterRegistration) -> Option<ReporterRegistration> {
        self.map().insert(reporter.name.clone(), reporter)
    }

    /// Remove by name. Returns whether an entry existed.
    pub fn remove(&self, name: &str) -> bool {
        self.map().remove(name).is_some()
    }

    /// Point-in-time copy of every reporter, sorted by name.
    pub fn list_all(&self) -> Vec<ReporterRegistration> {
        let mut list: Vec<_> = self.map().values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Reporters that asked for live updates.
    pub fn live(&self) -> Vec<ReporterRegistration> {
        self.list_all().into_iter().filter(|r| r.live).collect()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

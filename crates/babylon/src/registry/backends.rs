// std::sync::Mutex is correct here—lock is never held across .await points.
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::kind::CapabilityKind;
use super::normalize_callback;

// ============================================================================
// BackendRegistration
// ============================================================================

/// A registered actor or driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendRegistration {
    pub name: String,
    #[serde(rename = "type")]
    pub capability_type: String,
    /// Base URL, always ending in `/`.
    pub callback: String,
    /// Only used during the startup handshake; never exposed.
    #[serde(skip)]
    pub secret: Option<String>,
}

impl BackendRegistration {
    pub fn new(
        name: impl Into<String>,
        capability_type: impl Into<String>,
        callback: &str,
        secret: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            capability_type: capability_type.into(),
            callback: normalize_callback(callback),
            secret,
        }
    }

    /// `<callback><kind>/<name>/<path>`
    pub fn endpoint(&self, kind: CapabilityKind, path: &str) -> String {
        format!("{}{}/{}/{}", self.callback, kind, self.name, path)
    }
}

// ============================================================================
// BackendRegistry
// ============================================================================

struct Entry {
    registration: BackendRegistration,
    seq: u64,
}

#[derive(Default)]
struct Namespace {
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

/// Backends keyed by name, one namespace per [`CapabilityKind`].
///
/// When several backends advertise the same capability type, the most
/// recently registered one is selected.
#[derive(Default)]
pub struct BackendRegistry {
    actors: Mutex<Namespace>,
    drivers: Mutex<Namespace>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, kind: CapabilityKind) -> MutexGuard<'_, Namespace> {
        let lock = match kind {
            CapabilityKind::Actor => &self.actors,
            CapabilityKind::Driver => &self.drivers,
        };
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite by name. Returns the replaced registration.
    pub fn register(
        &self,
        kind: CapabilityKind,
        registration: BackendRegistration,
    ) -> Option<BackendRegistration> {
        let mut ns = self.namespace(kind);
        let seq = ns.next_seq;
        ns.next_seq += 1;
        ns.entries
            .insert(
                registration.name.clone(),
                Entry { registration, seq },
            )
            .map(|e| e.registration)
    }

    /// Remove by name. Returns whether an entry existed.
    pub fn deregister(&self, kind: CapabilityKind, name: &str) -> bool {
        self.namespace(kind).entries.remove(name).is_some()
    }

    /// Resolve the backend handling `capability_type`.
    pub fn find_by_type(
        &self,
        kind: CapabilityKind,
        capability_type: &str,
    ) -> Option<BackendRegistration> {
        self.namespace(kind)
            .entries
            .values()
            .filter(|e| e.registration.capability_type == capability_type)
            .max_by_key(|e| e.seq)
            .map(|e| e.registration.clone())
    }

    pub fn get(&self, kind: CapabilityKind, name: &str) -> Option<BackendRegistration> {
        self.namespace(kind)
            .entries
            .get(name)
            .map(|e| e.registration.clone())
    }

    /// Registrations of one kind, sorted by name.
    pub fn list(&self, kind: CapabilityKind) -> Vec<BackendRegistration> {
        let mut list: Vec<_> = self
            .namespace(kind)
            .entries
            .values()
            .map(|e| e.registration.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Point-in-time copy of every backend of both kinds.
    pub fn snapshot(&self) -> Vec<(CapabilityKind, BackendRegistration)> {
        CapabilityKind::ALL
            .into_iter()
            .flat_map(|kind| self.list(kind).into_iter().map(move |r| (kind, r)))
            .collect()
    }

    pub fn len(&self, kind: CapabilityKind) -> usize {
        self.namespace(kind).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        CapabilityKind::ALL.into_iter().all(|k| self.len(k) == 0)
    }
}

// ============================================================================
// Tests
// ============================================================================

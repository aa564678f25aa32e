// std::sync::Mutex is correct here—lock is never held across .await points.
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use babylon_protocol::{LogEntry, SessionContext, SessionView};

use super::error::SessionError;

// ============================================================================
// SessionEvents
// ============================================================================

/// Receives session activity. Implementations must not block.
pub trait SessionEvents: Send + Sync {
    /// Called after an entry has been appended.
    fn log_appended(&self, session_id: Uuid, entry: &LogEntry);

    /// Called exactly once per session, after it is marked terminated and
    /// before it is removed from the store.
    fn session_ended(&self, view: &SessionView);
}

// ============================================================================
// Session
// ============================================================================

struct Session {
    id: Uuid,
    state: Mutex<SessionState>,
}

struct SessionState {
    last_activity: DateTime<Utc>,
    log: Vec<LogEntry>,
    terminated: bool,
}

impl Session {
    fn new(id: Uuid) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState {
                last_activity: Utc::now(),
                log: Vec::new(),
                terminated: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self, state: &SessionState) -> SessionView {
        SessionView {
            uuid: self.id,
            context: SessionContext {
                log: state.log.clone(),
            },
        }
    }
}

// ============================================================================
// SessionStore
// ============================================================================

/// In-memory session registry. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Arc<Session>>>,
    events: Arc<dyn SessionEvents>,
}

impl SessionStore {
    pub fn new(events: Arc<dyn SessionEvents>) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            events,
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Create a session with a fresh random id and an empty log.
    pub fn create(&self) -> SessionView {
        let session = loop {
            let id = Uuid::new_v4();
            if !self.sessions.contains_key(&id) {
                break Arc::new(Session::new(id));
            }
        };
        let view = session.view(&session.lock());
        self.sessions.insert(session.id, session);

        info!(session_id = %view.uuid, "Session created");
        view
    }

    /// Snapshot of a live session. Does not count as activity.
    pub fn get(&self, id: &Uuid) -> Option<SessionView> {
        let session = self.lookup(id)?;
        let state = session.lock();
        (!state.terminated).then(|| session.view(&state))
    }

    /// Append an entry and forward it to [`SessionEvents::log_appended`].
    pub fn append_log(
        &self,
        id: &Uuid,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<LogEntry, SessionError> {
        let session = self.lookup(id).ok_or(SessionError::NotFound(*id))?;
        let entry = LogEntry::now(category, message);
        {
            let mut state = session.lock();
            if state.terminated {
                return Err(SessionError::NotFound(*id));
            }
            state.last_activity = entry.timestamp;
            state.log.push(entry.clone());
        }

        self.events.log_appended(*id, &entry);
        Ok(entry)
    }

    /// Tear down a session. Returns its final snapshot, or `None` if it was
    /// unknown or already terminated.
    pub fn delete(&self, id: &Uuid) -> Option<SessionView> {
        let view = self.terminate(id, None)?;
        info!(session_id = %id, entries = view.context.log.len(), "Session deleted");
        Some(view)
    }

    /// Tear down every session whose last activity is strictly before
    /// `now - window`. Returns the evicted ids.
    pub fn evict_inactive(&self, now: DateTime<Utc>, window: Duration) -> Vec<Uuid> {
        let Some(cutoff) = chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| now.checked_sub_signed(w))
        else {
            return Vec::new();
        };

        let candidates: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|e| e.value().lock().last_activity < cutoff)
            .map(|e| *e.key())
            .collect();

        let evicted: Vec<Uuid> = candidates
            .into_iter()
            .filter(|id| self.terminate(id, Some(cutoff)).is_some())
            .collect();

        for id in &evicted {
            info!(session_id = %id, "Session evicted after inactivity");
        }
        debug!(evicted = evicted.len(), remaining = self.len(), "Session sweep complete");
        evicted
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn contains(&self, id: &Uuid) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // ------------------------------------------------------------------------
    // Private
    // ------------------------------------------------------------------------

    fn lookup(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|e| Arc::clone(e.value()))
    }

    /// Shared teardown path. With `idle_before`, the session is only torn
    /// down if it is still idle once its lock is held.
    fn terminate(&self, id: &Uuid, idle_before: Option<DateTime<Utc>>) -> Option<SessionView> {
        let session = self.lookup(id)?;
        let view = {
            let mut state = session.lock();
            if state.terminated {
                return None;
            }
            if idle_before.is_some_and(|cutoff| state.last_activity >= cutoff) {
                return None;
            }
            state.terminated = true;
            session.view(&state)
        };

        self.events.session_ended(&view);
        self.sessions.remove(id);
        Some(view)
    }

    #[cfg(test)]
    pub(crate) fn set_last_activity(&self, id: &Uuid, at: DateTime<Utc>) {
        if let Some(session) = self.lookup(id) {
            session.lock().last_activity = at;
        }
    }
}

// ============================================================================
// Test Support
// ============================================================================


// ============================================================================
// Tests
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::SystemTime;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::events::{EventDispatcher, SessionAttributeEvent, SessionEvent};
use crate::security::Identity;

/// Default max-inactive interval for fresh sessions, in seconds.
pub const DEFAULT_MAX_INACTIVE_SECS: u32 = 1800;

/// Error raised by operations on an invalidated session.
///
/// Terminal: a session can never transition back to valid, so hitting
/// this indicates a caller bug, not a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    InvalidState,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::InvalidState => write!(f, "operation on an invalidated session"),
        }
    }
}

impl std::error::Error for SessionError {}

struct SessionState {
    created_at: SystemTime,
    last_accessed: SystemTime,
    max_inactive_secs: u32,
    valid: bool,
    /// Set while destroyed-listeners run, so a concurrent invalidate
    /// cannot fire the notification twice.
    destroying: bool,
    is_new: bool,
    attributes: HashMap<String, Value>,
    identity: Option<Identity>,
    pending_path: Option<String>,
}

/// Server-side state for one logical client conversation.
///
/// Owned by the [`SessionStore`]; handed to requests as `Arc` references
/// and held weakly by itself for event payloads. All mutable state sits
/// behind one lock, giving one-writer-at-a-time semantics per session
/// while distinct sessions proceed in parallel.
pub struct Session {
    id: String,
    weak_self: Weak<Session>,
    events: Arc<EventDispatcher>,
    state: Mutex<SessionState>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}

impl Session {
    fn new(id: String, events: Arc<EventDispatcher>) -> Arc<Self> {
        let now = SystemTime::now();
        Arc::new_cyclic(|weak_self| Self {
            id,
            weak_self: Weak::clone(weak_self),
            events,
            state: Mutex::new(SessionState {
                created_at: now,
                last_accessed: now,
                max_inactive_secs: DEFAULT_MAX_INACTIVE_SECS,
                valid: true,
                destroying: false,
                is_new: true,
                attributes: HashMap::new(),
                identity: None,
                pending_path: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checked_state(&self) -> Result<MutexGuard<'_, SessionState>, SessionError> {
        let guard = self.state();
        if guard.valid {
            Ok(guard)
        } else {
            Err(SessionError::InvalidState)
        }
    }

    /// Strong reference to self for event payloads. Fails only once the
    /// store and every request have dropped the session, in which case
    /// there is nobody left to notify.
    fn strong(&self) -> Option<Arc<Session>> {
        self.weak_self.upgrade()
    }

    /// The identifier, without a validity check. For store bookkeeping
    /// and log fields.
    pub(crate) fn raw_id(&self) -> &str {
        &self.id
    }

    /// The unique identifier assigned by the store.
    pub fn id(&self) -> Result<&str, SessionError> {
        self.checked_state().map(|_| self.id.as_str())
    }

    /// Whether the session has been invalidated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.state().valid
    }

    /// True until the first join after creation.
    pub fn is_new(&self) -> Result<bool, SessionError> {
        self.checked_state().map(|s| s.is_new)
    }

    pub fn creation_time(&self) -> Result<SystemTime, SessionError> {
        self.checked_state().map(|s| s.created_at)
    }

    pub fn last_accessed_time(&self) -> Result<SystemTime, SessionError> {
        self.checked_state().map(|s| s.last_accessed)
    }

    pub fn max_inactive_interval(&self) -> Result<u32, SessionError> {
        self.checked_state().map(|s| s.max_inactive_secs)
    }

    pub fn set_max_inactive_interval(&self, seconds: u32) -> Result<(), SessionError> {
        self.checked_state().map(|mut s| s.max_inactive_secs = seconds)
    }

    /// Record a join from an existing client: bump the last-access time
    /// and clear the `is_new` flag.
    pub(crate) fn access(&self) {
        let mut state = self.state();
        state.last_accessed = SystemTime::now();
        state.is_new = false;
    }

    /// Read an attribute value.
    pub fn attribute(&self, name: &str) -> Result<Option<Value>, SessionError> {
        self.checked_state().map(|s| s.attributes.get(name).cloned())
    }

    /// Names of every bound attribute, in no particular order.
    pub fn attribute_names(&self) -> Result<Vec<String>, SessionError> {
        self.checked_state()
            .map(|s| s.attributes.keys().cloned().collect())
    }

    /// Bind an attribute, firing an added or replaced notification to
    /// attribute listeners in registration order.
    ///
    /// Notifications run after the state lock is released, so listeners
    /// may read back through the session.
    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), SessionError> {
        let name = name.into();
        let value = value.into();
        let old = {
            let mut state = self.checked_state()?;
            state.attributes.insert(name.clone(), value.clone())
        };
        let Some(session) = self.strong() else {
            return Ok(());
        };
        let event = SessionAttributeEvent {
            session,
            name,
            old: old.clone(),
            new: Some(value),
        };
        if old.is_some() {
            self.events.attribute_replaced(&event);
        } else {
            self.events.attribute_added(&event);
        }
        Ok(())
    }

    /// Unbind an attribute, firing a removed notification only when the
    /// name was actually bound.
    pub fn remove_attribute(&self, name: &str) -> Result<(), SessionError> {
        let old = {
            let mut state = self.checked_state()?;
            state.attributes.remove(name)
        };
        if let Some(old) = old {
            let Some(session) = self.strong() else {
                return Ok(());
            };
            self.events.attribute_removed(&SessionAttributeEvent {
                session,
                name: name.to_string(),
                old: Some(old),
                new: None,
            });
        }
        Ok(())
    }

    /// The identity bound to this session, if authentication succeeded.
    pub fn identity(&self) -> Result<Option<Identity>, SessionError> {
        self.checked_state().map(|s| s.identity.clone())
    }

    pub(crate) fn bind_identity(&self, identity: Identity) -> Result<(), SessionError> {
        self.checked_state().map(|mut s| s.identity = Some(identity))
    }

    pub(crate) fn set_pending_path(&self, path: String) -> Result<(), SessionError> {
        self.checked_state().map(|mut s| s.pending_path = Some(path))
    }

    pub(crate) fn take_pending_path(&self) -> Result<Option<String>, SessionError> {
        self.checked_state().map(|mut s| s.pending_path.take())
    }

    /// Invalidate the session.
    ///
    /// Fires the destroyed notification to session listeners in reverse
    /// registration order while the session is still readable, then
    /// clears the attribute mapping and marks the session permanently
    /// invalid.
    pub fn invalidate(&self) -> Result<(), SessionError> {
        {
            let mut state = self.checked_state()?;
            if state.destroying {
                return Err(SessionError::InvalidState);
            }
            state.destroying = true;
        }

        if let Some(session) = self.strong() {
            self.events.session_destroyed(&SessionEvent { session });
        }

        let mut state = self.state();
        state.attributes.clear();
        state.identity = None;
        state.pending_path = None;
        state.valid = false;
        info!(session_id = %self.id, "Session invalidated");
        Ok(())
    }
}

/// Creates, retrieves, and invalidates sessions.
///
/// Backed by a concurrent map so distinct sessions never contend.
/// Identifiers are assigned from an atomic counter starting at 1,
/// stringified, and never reused.
pub struct SessionStore {
    sessions: DashMap<String, Arc<Session>>,
    next_id: AtomicU64,
    events: Arc<EventDispatcher>,
}

impl SessionStore {
    #[must_use]
    pub fn new(events: Arc<EventDispatcher>) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Create a fresh session and fire the created notification to
    /// session listeners in registration order.
    pub fn create(&self) -> Arc<Session> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let session = Session::new(id.clone(), Arc::clone(&self.events));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        debug!(session_id = %id, live_sessions = self.sessions.len(), "Session created");
        self.events.session_created(&SessionEvent {
            session: Arc::clone(&session),
        });
        session
    }

    /// Look up a live session; invalidated sessions are absent.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        if session.is_valid() {
            Some(session)
        } else {
            // invalidated behind our back; drop the stale entry
            self.sessions.remove(id);
            None
        }
    }

    /// Join the presented session, or create a new one when the token is
    /// absent or stale. Joining updates the last-access time and clears
    /// the `is_new` flag.
    pub fn get_or_create(&self, presented: Option<&str>) -> Arc<Session> {
        if let Some(id) = presented {
            if let Some(session) = self.get(id) {
                session.access();
                return session;
            }
            debug!(session_id = %id, "Presented session token is stale; creating a fresh session");
        }
        self.create()
    }

    /// Invalidate by identifier; see [`Session::invalidate`].
    pub fn invalidate(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .sessions
            .remove(id)
            .map(|(_, session)| session)
            .ok_or(SessionError::InvalidState)?;
        session.invalidate()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

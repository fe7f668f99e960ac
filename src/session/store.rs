//! Session storage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::session::{Session, SessionData};

/// Idle lifetime of a stored session when none is configured.
pub const DEFAULT_MAX_IDLE_SECS: u64 = 1800;

/// Backend holding session data between requests.
pub trait SessionStore: Send + Sync + 'static {
    fn load(&self, id: &str) -> Option<SessionData>;

    fn save(&self, id: &str, data: &SessionData);

    fn destroy(&self, id: &str);

    /// Drop sessions idle past their lifetime, returning how many went.
    ///
    /// Stores that expire entries on their own keep the default.
    fn purge_expired(&self) -> usize {
        0
    }

    /// Resume the session named by the client, or start a new one.
    fn open(&self, id: Option<&str>) -> Session {
        match id.and_then(|id| self.load(id).map(|data| (id, data))) {
            Some((id, data)) => Session::from_parts(id, data),
            None => Session::new(),
        }
    }

    /// Persist the session, applying a pending id regeneration.
    ///
    /// Returns the id the client must present next time, or `None` when the
    /// session was started by this request and nothing was written to it.
    fn commit(&self, mut session: Session) -> Option<String> {
        if session.is_disposable() {
            return None;
        }
        if let Some(retired) = session.rotate_id() {
            tracing::debug!("Session id regenerated");
            self.destroy(&retired);
        }
        let (id, data) = session.into_parts();
        self.save(&id, &data);
        Some(id)
    }
}

struct StoredSession {
    data: SessionData,
    touched: Instant,
}

impl StoredSession {
    fn is_idle(&self, max_idle: Duration) -> bool {
        self.touched.elapsed() >= max_idle
    }
}

/// In-process session store with idle expiry.
///
/// Expired entries are dropped when looked up and by [`SessionStore::purge_expired`].
#[derive(Clone)]
pub struct MemorySessionStore {
    inner: Arc<DashMap<String, StoredSession>>,
    max_idle: Duration,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = max_idle;
        self
    }

    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Number of stored sessions, expired ones not yet purged included.
    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_idle: Duration::from_secs(DEFAULT_MAX_IDLE_SECS),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &str) -> Option<SessionData> {
        let max_idle = self.max_idle;
        if self.inner.remove_if(id, |_, s| s.is_idle(max_idle)).is_some() {
            tracing::debug!("Session expired");
            return None;
        }
        let mut entry = self.inner.get_mut(id)?;
        entry.touched = Instant::now();
        Some(entry.data.clone())
    }

    fn save(&self, id: &str, data: &SessionData) {
        self.inner.insert(
            id.to_string(),
            StoredSession {
                data: data.clone(),
                touched: Instant::now(),
            },
        );
    }

    fn destroy(&self, id: &str) {
        self.inner.remove(id);
    }

    fn purge_expired(&self) -> usize {
        let max_idle = self.max_idle;
        let before = self.inner.len();
        self.inner.retain(|_, s| !s.is_idle(max_idle));
        before.saturating_sub(self.inner.len())
    }
}

impl std::fmt::Debug for MemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionStore")
            .field("sessions", &self.inner.len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

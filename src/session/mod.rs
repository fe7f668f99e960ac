//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Request cookie (session id)
//!     → store.rs (load SessionData or start fresh)
//!     → Session passed explicitly into Dispatcher and every action
//!     → actions mutate auth flag, CSRF records, flash, values
//!     → store.rs (save under current or regenerated id)
//!     → Set-Cookie
//! ```
//!
//! # Design Decisions
//! - No ambient global: the session is an injected context object
//! - One in-flight request per session id is assumed; the store does not
//!   serialize concurrent writers
//! - Authentication changes request an id regeneration (once per request)
//! - A new session that stays empty is never stored and gets no cookie
//! - Stored sessions expire after an idle period; sweeper.rs purges them

pub mod flash;
pub mod store;
pub mod sweeper;

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::security::csrf::TokenRecord;
use crate::session::flash::FlashKind;

pub use flash::{Flash, InvalidFlashKind};
pub use store::{MemorySessionStore, SessionStore, DEFAULT_MAX_IDLE_SECS};
pub use sweeper::run_sweeper;

/// Everything persisted between requests for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    pub authenticated: bool,
    /// Outstanding CSRF records per form identity, oldest first.
    pub csrf_tokens: HashMap<String, VecDeque<TokenRecord>>,
    /// Persisted flash tier.
    pub flash: BTreeMap<FlashKind, String>,
    /// Application values.
    pub values: BTreeMap<String, serde_json::Value>,
}

/// A live session for the request being served.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    data: SessionData,
    regenerate: bool,
    fresh: bool,
}

impl Session {
    /// Start a fresh session with a new id.
    pub fn new() -> Self {
        Self {
            fresh: true,
            ..Self::from_parts(new_session_id(), SessionData::default())
        }
    }

    /// Resume a stored session.
    pub fn from_parts(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: id.into(),
            data,
            regenerate: false,
            fresh: false,
        }
    }

    /// Started by this request rather than loaded from a store.
    pub fn is_new(&self) -> bool {
        self.fresh
    }

    /// A new session nothing has been written to.
    pub fn is_disposable(&self) -> bool {
        self.fresh && self.data == SessionData::default()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut SessionData {
        &mut self.data
    }

    /// Store a serializable value.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        self.data.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Read a value back; `None` when missing or of another shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.values.remove(key)
    }

    /// Drop all session state, authentication included.
    pub fn clear(&mut self) {
        self.data = SessionData::default();
    }

    /// Ask for a new session id when the session is saved.
    pub fn regenerate(&mut self) {
        self.regenerate = true;
    }

    pub fn regeneration_requested(&self) -> bool {
        self.regenerate
    }

    /// Mark the session (un)authenticated. Regenerates the id.
    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.data.authenticated = authenticated;
        self.regenerate();
    }

    pub fn is_authenticated(&self) -> bool {
        self.data.authenticated
    }

    /// Apply a pending regeneration, returning the retired id.
    pub fn rotate_id(&mut self) -> Option<String> {
        if !self.regenerate {
            return None;
        }
        self.regenerate = false;
        Some(std::mem::replace(&mut self.id, new_session_id()))
    }

    pub fn into_parts(self) -> (String, SessionData) {
        (self.id, self.data)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_round_trip_through_json() {
        let mut session = Session::new();
        session.set("user_id", &42u64).unwrap();
        assert_eq!(session.get::<u64>("user_id"), Some(42));
        assert_eq!(session.get::<String>("user_id"), None);
        assert!(session.contains("user_id"));
        assert!(session.remove("user_id").is_some());
        assert!(!session.contains("user_id"));
    }

    #[test]
    fn test_set_authenticated_requests_new_id() {
        let mut session = Session::new();
        let original = session.id().to_string();
        assert!(session.rotate_id().is_none());

        session.set_authenticated(true);
        assert!(session.is_authenticated());
        assert!(session.regeneration_requested());

        let retired = session.rotate_id().unwrap();
        assert_eq!(retired, original);
        assert_ne!(session.id(), original);
        assert!(!session.regeneration_requested());
    }

    #[test]
    fn test_clear_drops_authentication() {
        let mut session = Session::new();
        session.set_authenticated(true);
        session.set("k", &"v").unwrap();
        session.clear();
        assert!(!session.is_authenticated());
        assert!(!session.contains("k"));
    }

    #[test]
    fn test_only_untouched_new_sessions_are_disposable() {
        let mut session = Session::new();
        assert!(session.is_new());
        assert!(session.is_disposable());

        session.set("k", &"v").unwrap();
        assert!(!session.is_disposable());

        let resumed = Session::from_parts("abc", SessionData::default());
        assert!(!resumed.is_new());
        assert!(!resumed.is_disposable());
    }
}

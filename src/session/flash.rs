//! Flash messages.
//!
//! Two tiers: the *now* tier lives in the current request only; the
//! *persisted* tier lives in the session and is moved into the now tier by
//! the next dispatched action, after which it is gone.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Session;

/// Closed set of flash categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Primary,
    Secondary,
    Success,
    Danger,
    Warning,
    Info,
    Light,
    Dark,
}

impl FlashKind {
    pub const ALL: [FlashKind; 8] = [
        FlashKind::Primary,
        FlashKind::Secondary,
        FlashKind::Success,
        FlashKind::Danger,
        FlashKind::Warning,
        FlashKind::Info,
        FlashKind::Light,
        FlashKind::Dark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlashKind::Primary => "primary",
            FlashKind::Secondary => "secondary",
            FlashKind::Success => "success",
            FlashKind::Danger => "danger",
            FlashKind::Warning => "warning",
            FlashKind::Info => "info",
            FlashKind::Light => "light",
            FlashKind::Dark => "dark",
        }
    }
}

impl fmt::Display for FlashKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid flash message type: {0}")]
pub struct InvalidFlashKind(pub String);

impl FromStr for FlashKind {
    type Err = InvalidFlashKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlashKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| InvalidFlashKind(s.to_string()))
    }
}

/// Messages visible to the response currently being built.
///
/// Values are plain text; escaping is the renderer's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Flash {
    now: BTreeMap<FlashKind, String>,
}

impl Flash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: FlashKind) -> Option<&str> {
        self.now.get(&kind).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlashKind, &str)> {
        self.now.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.now.is_empty()
    }

    /// Show a message in this response only.
    ///
    /// Drops a persisted message of the same kind so it does not show up
    /// again on the next request.
    pub fn set_now(&mut self, session: &mut Session, kind: FlashKind, message: impl Into<String>) {
        self.now.insert(kind, message.into());
        session.data_mut().flash.remove(&kind);
    }

    /// Persist a message for the next request.
    pub fn set(session: &mut Session, kind: FlashKind, message: impl Into<String>) {
        session.data_mut().flash.insert(kind, message.into());
    }

    /// Move persisted messages into this tier and clear them from the session.
    pub fn migrate(&mut self, session: &mut Session) {
        let persisted = std::mem::take(&mut session.data_mut().flash);
        if !persisted.is_empty() {
            tracing::trace!(count = persisted.len(), "Migrating persisted flash messages");
        }
        self.now.extend(persisted);
    }
}

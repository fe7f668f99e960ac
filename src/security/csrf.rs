//! CSRF token issuance and validation.
//!
//! # Responsibilities
//! - Issue random single-use tokens scoped to a form identity
//! - Keep at most `capacity` outstanding tokens per form (FIFO eviction)
//! - Validate a submitted token: valid, expired, or unknown
//!
//! # Design Decisions
//! - Tokens live in the session, not in a cookie
//! - A matched token is consumed even when it turns out to be expired
//! - Validation is three-valued so callers can word "expired" differently
//!   from "forged"

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::config::CsrfConfig;
use crate::observability::metrics;
use crate::session::Session;

/// Outstanding tokens kept per form identity.
pub const DEFAULT_CAPACITY: usize = 10;

/// Seconds a token stays valid.
pub const DEFAULT_EXPIRY_SECS: u64 = 1800;

/// Random bytes per token (hex encoded, so twice as many characters).
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// One issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    /// Issuance time, seconds since the Unix epoch.
    pub issued_at: u64,
}

/// Result of validating a submitted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrfOutcome {
    Valid,
    /// Recognized, but issued longer ago than the expiry allows.
    Expired,
    /// Not among the outstanding tokens for this form.
    Unauthorized,
}

impl CsrfOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, CsrfOutcome::Valid)
    }

    /// Rejection reason, `None` when valid.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            CsrfOutcome::Valid => None,
            CsrfOutcome::Expired => Some("expired"),
            CsrfOutcome::Unauthorized => Some("unauthorized"),
        }
    }

    pub fn into_result(self) -> Result<(), CsrfRejected> {
        match self {
            CsrfOutcome::Valid => Ok(()),
            CsrfOutcome::Expired => Err(CsrfRejected::Expired),
            CsrfOutcome::Unauthorized => Err(CsrfRejected::Unauthorized),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        self.reason().unwrap_or("valid")
    }
}

/// A rejected token, for callers that prefer `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfRejected {
    #[error("CSRF token expired")]
    Expired,
    #[error("CSRF token not recognized")]
    Unauthorized,
}

/// Issues and checks CSRF tokens stored in a session.
#[derive(Debug, Clone)]
pub struct CsrfTokens {
    capacity: usize,
    token_length: usize,
    expiry: Duration,
}

impl CsrfTokens {
    pub fn new(config: &CsrfConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            token_length: config.token_length.max(1),
            expiry: Duration::from_secs(config.expire_secs),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    /// Issue a token of the configured length.
    pub fn issue(&self, session: &mut Session, form_id: &str) -> String {
        self.issue_with_length(session, form_id, self.token_length)
    }

    /// Issue a token of `length` random bytes, at least one.
    pub fn issue_with_length(&self, session: &mut Session, form_id: &str, length: usize) -> String {
        self.issue_at(session, form_id, length, unix_now())
    }

    pub(crate) fn issue_at(
        &self,
        session: &mut Session,
        form_id: &str,
        length: usize,
        now: u64,
    ) -> String {
        let token = generate_token(length.max(1));
        let records = session
            .data_mut()
            .csrf_tokens
            .entry(form_id.to_string())
            .or_default();

        while records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(TokenRecord {
            token: token.clone(),
            issued_at: now,
        });

        tracing::trace!(form = %form_id, outstanding = records.len(), "CSRF token issued");
        token
    }

    /// Validate against the configured expiry.
    pub fn validate(&self, session: &mut Session, form_id: &str, token: &str) -> CsrfOutcome {
        self.validate_with_expiry(session, form_id, token, self.expiry)
    }

    /// Validate and consume `token`.
    pub fn validate_with_expiry(
        &self,
        session: &mut Session,
        form_id: &str,
        token: &str,
        expiry: Duration,
    ) -> CsrfOutcome {
        self.validate_at(session, form_id, token, expiry, unix_now())
    }

    pub(crate) fn validate_at(
        &self,
        session: &mut Session,
        form_id: &str,
        token: &str,
        expiry: Duration,
        now: u64,
    ) -> CsrfOutcome {
        let outcome = consume(session, form_id, token, expiry, now);
        metrics::record_csrf(outcome.label());
        if !outcome.is_ok() {
            tracing::debug!(form = %form_id, reason = outcome.label(), "CSRF token rejected");
        }
        outcome
    }
}

impl Default for CsrfTokens {
    fn default() -> Self {
        Self::new(&CsrfConfig::default())
    }
}

fn consume(session: &mut Session, form_id: &str, token: &str, expiry: Duration, now: u64) -> CsrfOutcome {
    if token.is_empty() {
        return CsrfOutcome::Unauthorized;
    }
    let tokens = &mut session.data_mut().csrf_tokens;
    let Some(records) = tokens.get_mut(form_id) else {
        return CsrfOutcome::Unauthorized;
    };

    let position = records
        .iter()
        .position(|r| bool::from(r.token.as_bytes().ct_eq(token.as_bytes())));
    let Some(record) = position.and_then(|i| records.remove(i)) else {
        return CsrfOutcome::Unauthorized;
    };

    if records.is_empty() {
        tokens.remove(form_id);
    }

    if now.saturating_sub(record.issued_at) < expiry.as_secs() {
        CsrfOutcome::Valid
    } else {
        CsrfOutcome::Expired
    }
}

fn generate_token(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

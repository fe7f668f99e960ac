//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Action renders a form:
//!     → csrf.rs issue(session, form id) → token in a hidden field
//!
//! Next request submits the form:
//!     → csrf.rs validate(session, form id, token)
//!     → Valid | Expired | Unauthorized, branched on by the action
//! ```
//!
//! # Design Decisions
//! - Tokens are single-use and bounded per form identity
//! - The dispatcher never validates on its own; actions decide
//! - No trust in client input: comparisons are constant-time

pub mod csrf;

pub use csrf::{CsrfOutcome, CsrfRejected, CsrfTokens};

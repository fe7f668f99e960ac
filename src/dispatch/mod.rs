//! Action dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request + Session
//!     → dispatcher.rs (resolve via routing::Router)
//!     → registry.rs (controller id → fresh instance)
//!     → pipeline.rs (auth check, flash migration, hooks, action body)
//!     → context.rs (ActionContext: params, session, flash, CSRF, views)
//!     → Response
//!
//! Recovery:
//!     NotFound      → fixed not-found page (detail only in debug mode)
//!     Unauthorized  → login target, no params, no re-resolution
//!     Handler error → returned to the transport
//! ```
//!
//! # Design Decisions
//! - Controllers declare actions, auth and hooks as static tables
//! - Early exits are `DispatchError` values, never panics
//! - The session is passed in explicitly; nothing reaches for globals

pub mod context;
pub mod controller;
pub mod dispatcher;
pub mod pipeline;
pub mod registry;

pub use context::{ActionContext, CSRF_FIELD};
pub use controller::{
    Action, ActionResult, AuthPolicy, BoxError, Controller, DispatchError, Hook,
};
pub use dispatcher::{Dispatcher, NOT_FOUND_MESSAGE};
pub use registry::{AnyController, ControllerRegistry};

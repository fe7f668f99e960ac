//! Routing and action dispatch core for small MVC web applications.
//!
//! # Architecture Overview
//!
//! ```text
//!   route definitions (TOML)                      per request
//!   ────────────────────────                      ───────────
//!   config ──▶ routing::tokens (expand %rest)     http::server (axum)
//!                  │                                  │ Request + Session (cookie)
//!                  ▼                                  ▼
//!              routing::compiler ──▶ RouteTable ◀── dispatch::Dispatcher
//!                                    (immutable)      │ resolve → registry → pipeline
//!                                                     ▼
//!                                  auth check → flash → hooks → action → hooks
//!                                                     │
//!                                   security::csrf ◀──┤ session::flash
//!                                                     ▼
//!                                                 Response
//! ```

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;
pub mod view;

pub use config::AppConfig;
pub use dispatch::{
    Action, ActionContext, ActionResult, AuthPolicy, Controller, ControllerRegistry,
    DispatchError, Dispatcher, Hook,
};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::{Application, Shutdown};
pub use routing::{RouteDefinition, RouteParams, Router, Verb};
pub use security::csrf::{CsrfOutcome, CsrfTokens};
pub use session::flash::FlashKind;
pub use session::{Flash, MemorySessionStore, Session, SessionStore};
pub use view::{PlainRenderer, Renderer};

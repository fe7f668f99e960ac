//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware, body + cookie extraction)
//!     → request.rs (method → verb, `_method` override, mount prefix)
//!     → dispatch::Dispatcher
//!     → response.rs (status, headers, body → axum response)
//!     → Set-Cookie when the session id is new or rotated
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{path_info, verb_from_method, Request, METHOD_OVERRIDE_FIELD};
pub use response::Response;
pub use server::{AppState, HttpServer};

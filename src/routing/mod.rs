//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteDefinition[] (template + metadata, declaration order)
//!     → tokens.rs (parse segments, expand %rest markers)
//!     → compiler.rs (default verb, named groups, anchored patterns)
//!     → Freeze as immutable Router
//!
//! Incoming Request (path, verb)
//!     → router.rs (build match key, scan table)
//!     → Return: RouteParams or no-match
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Malformed definitions abort startup (BuildError), never per request
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order, no priority sorting)

pub mod compiler;
pub mod error;
pub mod params;
pub mod router;
pub mod tokens;
pub mod verb;

pub use compiler::{CompiledRoute, RouteTable};
pub use error::BuildError;
pub use params::RouteParams;
pub use router::Router;
pub use tokens::{Metadata, RouteDefinition};
pub use verb::Verb;

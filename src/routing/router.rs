//! Route lookup.
//!
//! # Responsibilities
//! - Own the compiled route table
//! - Build the match key from a request path and verb
//! - Return the first matching route's parameters or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in declaration order; first match wins
//! - No specificity ranking: `/posts/:id` declared before `/posts/new`
//!   captures `id = "new"`

use crate::routing::compiler::{RouteTable, VERB_SEPARATOR};
use crate::routing::error::BuildError;
use crate::routing::params::RouteParams;
use crate::routing::tokens::RouteDefinition;
use crate::routing::verb::Verb;

/// Resolves request paths against a compiled route table.
#[derive(Debug, Clone, Default)]
pub struct Router {
    table: RouteTable,
}

impl Router {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    /// Compile definitions and wrap the resulting table.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        let table = RouteTable::build(definitions)?;
        tracing::info!(routes = table.len(), "Route table built");
        Ok(Self::new(table))
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve a path and verb. `None` means no route matched.
    pub fn resolve(&self, path: &str, verb: Verb) -> Option<RouteParams> {
        let key = match_key(path, verb);
        self.table.iter().find_map(|route| route.match_key(&key))
    }

    /// Resolve with a verb token straight from the wire.
    ///
    /// Unsupported verbs never match.
    pub fn resolve_token(&self, path: &str, verb: &str) -> Option<RouteParams> {
        let verb = verb.parse::<Verb>().ok()?;
        self.resolve(path, verb)
    }
}

/// Build the string matched against compiled patterns.
pub fn match_key(path: &str, verb: Verb) -> String {
    if path.starts_with('/') {
        format!("{}{}{}", path, VERB_SEPARATOR, verb)
    } else {
        format!("/{}{}{}", path, VERB_SEPARATOR, verb)
    }
}

//! Route table builder.
//!
//! # Responsibilities
//! - Expand every definition through the token compiler
//! - Default unpinned verbs to GET
//! - Turn `:name` segments into named capture groups
//! - Append the verb as a fixed trailing segment and anchor the pattern
//! - Prefix metadata keys so they never collide with captured names
//!
//! # Design Decisions
//! - Compilation is total or fails as a whole (`BuildError`)
//! - Table order == expansion order; nothing is sorted
//! - A repeated (verb, path) keeps its first position, later metadata wins

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use regex::Regex;

use crate::routing::error::BuildError;
use crate::routing::params::{RouteParams, INTERNAL_PREFIX};
use crate::routing::tokens::{self, ExpandedRoute, Metadata, RouteDefinition, Segment};
use crate::routing::verb::Verb;

/// Separator between the request path and the verb in a match key.
pub const VERB_SEPARATOR: &str = "/@";

/// Metadata every compiled route must carry.
const REQUIRED_METADATA: [&str; 2] = ["controller", "action"];

/// One concrete verb + path combination, ready to match.
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    template: String,
    source: String,
    verb: Verb,
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
    metadata: Metadata,
}

impl CompiledRoute {
    fn compile(route: ExpandedRoute, verb: Verb) -> Result<Self, BuildError> {
        let template = format!("{}@{}", route.path(), verb);

        for key in REQUIRED_METADATA {
            if !route.metadata.contains_key(key) {
                return Err(BuildError::MissingMetadata {
                    template: route.source,
                    key,
                });
            }
        }

        let mut param_names: Vec<String> = Vec::new();
        let mut parts = Vec::with_capacity(route.segments.len());
        for segment in &route.segments {
            match segment {
                Segment::Literal(lit) => parts.push(regex::escape(lit)),
                Segment::Param(name) => {
                    if param_names.contains(name) {
                        return Err(BuildError::DuplicateParam {
                            template: route.source,
                            name: name.clone(),
                        });
                    }
                    parts.push(format!("(?P<{}>[^/]+)", name));
                    param_names.push(name.clone());
                }
            }
        }

        let pattern = format!("^/{}{}{}$", parts.join("/"), VERB_SEPARATOR, verb);
        let regex = Regex::new(&pattern).map_err(|source| BuildError::Pattern {
            template: route.source.clone(),
            source,
        })?;

        let metadata = route
            .metadata
            .into_iter()
            .map(|(k, v)| (format!("{}{}", INTERNAL_PREFIX, k), v))
            .collect();

        Ok(Self {
            template,
            source: route.source,
            verb,
            pattern,
            regex,
            param_names,
            metadata,
        })
    }

    /// Concrete template, e.g. `/posts/:id@patch`.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Authored template this route was expanded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Anchored regular expression source.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Capture names in left-to-right order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Metadata with prefixed keys.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Match a full key (`path` + `/@` + `verb`) against this route.
    ///
    /// Captures are decoded like form values and override metadata entries
    /// of the same name.
    pub fn match_key(&self, key: &str) -> Option<RouteParams> {
        let captures = self.regex.captures(key)?;
        let mut values = self.metadata.clone();
        for name in &self.param_names {
            if let Some(m) = captures.name(name) {
                values.insert(name.clone(), decode_component(m.as_str()));
            }
        }
        Some(RouteParams::new(values))
    }
}

/// `+` becomes a space, then percent escapes are decoded.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Ordered, immutable list of compiled routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile a set of definitions in declaration order.
    pub fn build<I>(definitions: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = RouteDefinition>,
    {
        let mut expanded: Vec<(ExpandedRoute, Verb)> = Vec::new();
        let mut positions: HashMap<(Verb, String), usize> = HashMap::new();

        for definition in definitions {
            for route in tokens::expand(&definition)? {
                let verb = route.verb.unwrap_or_default();
                let key = (verb, route.path());
                match positions.get(&key) {
                    Some(&index) => {
                        tracing::warn!(
                            verb = %verb,
                            path = %key.1,
                            template = %route.source,
                            "Route redefined, keeping first position with new metadata"
                        );
                        expanded[index] = (route, verb);
                    }
                    None => {
                        positions.insert(key, expanded.len());
                        expanded.push((route, verb));
                    }
                }
            }
        }

        let routes = expanded
            .into_iter()
            .map(|(route, verb)| CompiledRoute::compile(route, verb))
            .collect::<Result<Vec<_>, _>>()?;

        for route in &routes {
            tracing::debug!(
                template = %route.template,
                pattern = %route.pattern,
                "Compiled route"
            );
        }

        Ok(Self { routes })
    }

    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CompiledRoute> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a CompiledRoute;
    type IntoIter = std::slice::Iter<'a, CompiledRoute>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

//! Token compiler.
//!
//! # Responsibilities
//! - Split a route template into literal and `:name` segments
//! - Peel off the trailing `@verb` pin
//! - Expand the `%rest` / `%rest[..]` / `%[..]` resource marker into one
//!   definition per action, in declaration order
//!
//! # Template Syntax
//! ```text
//! /posts/:id/comments@post    literal, parameter, literal, pinned verb
//! /posts/%rest                seven canonical actions
//! /posts/%rest[publish@post]  seven canonical actions + `publish`
//! /posts/%[index,show]        only the listed actions
//! ```

use std::collections::BTreeMap;

use crate::routing::error::BuildError;
use crate::routing::verb::Verb;

/// Metadata attached to a route definition (handler id, action id, extras).
pub type Metadata = BTreeMap<String, String>;

/// Canonical actions produced by a bare `%rest`, in expansion order.
pub const CANONICAL_ACTIONS: [&str; 7] =
    ["index", "show", "new", "create", "edit", "update", "destroy"];

/// A route definition as written by the configuration author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub template: String,
    pub metadata: Metadata,
}

impl RouteDefinition {
    pub fn new<I, K, V>(template: impl Into<String>, metadata: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            template: template.into(),
            metadata: metadata
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One path segment of a concrete route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// An entry of a resource marker's action list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceAction {
    pub name: String,
    /// Verb pinned with `name@verb`; canonical lookup applies when absent.
    pub verb: Option<Verb>,
}

/// A template split into its parts, before expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub segments: Vec<Segment>,
    pub verb: Option<Verb>,
    /// Actions requested by a trailing resource marker.
    pub resource: Option<Vec<ResourceAction>>,
}

/// A single concrete definition after shorthand expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedRoute {
    /// Template this route was generated from.
    pub source: String,
    pub segments: Vec<Segment>,
    /// `None` when the author did not pin a verb; the table builder defaults it.
    pub verb: Option<Verb>,
    pub metadata: Metadata,
}

impl ExpandedRoute {
    /// Path part rendered back in template syntax, e.g. `/posts/:id/edit`.
    pub fn path(&self) -> String {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Literal(lit) => lit.clone(),
                Segment::Param(name) => format!(":{}", name),
            })
            .collect();
        format!("/{}", parts.join("/"))
    }
}

/// Parse a template into segments, verb pin and resource marker.
pub fn parse_template(template: &str) -> Result<ParsedTemplate, BuildError> {
    if !template.starts_with('/') {
        return Err(BuildError::MissingLeadingSlash {
            template: template.to_string(),
        });
    }

    // A marker is a whole segment starting with `%`.
    let (path, marker) = match template.find("/%") {
        Some(pos) => (&template[..pos], Some(&template[pos + 2..])),
        None => (template, None),
    };

    let (path, verb) = match marker {
        Some(_) => {
            if path.contains('@') {
                return Err(BuildError::MisplacedVerb {
                    template: template.to_string(),
                });
            }
            (path, None)
        }
        None => split_verb(template, path)?,
    };

    let segments = parse_segments(template, path)?;
    let resource = marker
        .map(|m| parse_marker(template, m))
        .transpose()?;

    Ok(ParsedTemplate {
        segments,
        verb,
        resource,
    })
}

/// Expand one definition into its concrete routes.
///
/// Definitions without a resource marker pass through unchanged. Marker
/// expansion keeps the action list order and overrides `action` in a copy of
/// the metadata for each generated route.
pub fn expand(definition: &RouteDefinition) -> Result<Vec<ExpandedRoute>, BuildError> {
    let parsed = parse_template(&definition.template)?;

    let Some(actions) = parsed.resource else {
        return Ok(vec![ExpandedRoute {
            source: definition.template.clone(),
            segments: parsed.segments,
            verb: parsed.verb,
            metadata: definition.metadata.clone(),
        }]);
    };

    let routes = actions
        .into_iter()
        .map(|action| {
            let (tail, verb) = action_tail(&action);
            let mut segments = parsed.segments.clone();
            segments.extend(tail);

            let mut metadata = definition.metadata.clone();
            metadata.insert("action".to_string(), action.name);

            ExpandedRoute {
                source: definition.template.clone(),
                segments,
                verb: Some(verb),
                metadata,
            }
        })
        .collect();

    Ok(routes)
}

fn split_verb<'a>(
    template: &str,
    path: &'a str,
) -> Result<(&'a str, Option<Verb>), BuildError> {
    match path.matches('@').count() {
        0 => Ok((path, None)),
        1 => {
            let (path, verb) = path.split_once('@').unwrap_or((path, ""));
            if verb.contains('/') {
                return Err(BuildError::MisplacedVerb {
                    template: template.to_string(),
                });
            }
            let verb = verb.parse::<Verb>().map_err(|_| BuildError::UnknownVerb {
                template: template.to_string(),
                verb: verb.to_string(),
            })?;
            Ok((path, Some(verb)))
        }
        _ => Err(BuildError::MultipleVerbs {
            template: template.to_string(),
        }),
    }
}

fn parse_segments(template: &str, path: &str) -> Result<Vec<Segment>, BuildError> {
    // `path` is either empty (marker directly under the root) or starts with `/`.
    let Some(rest) = path.strip_prefix('/') else {
        return Ok(Vec::new());
    };

    rest.split('/')
        .map(|raw| match raw.strip_prefix(':') {
            Some(name) if is_valid_param_name(name) => Ok(Segment::Param(name.to_string())),
            Some(name) => Err(BuildError::InvalidParam {
                template: template.to_string(),
                name: name.to_string(),
            }),
            None => Ok(Segment::Literal(raw.to_string())),
        })
        .collect()
}

/// Parameter names become regex group names; a leading `_` is reserved for
/// routing-internal metadata keys.
pub(crate) fn is_valid_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn parse_marker(template: &str, marker: &str) -> Result<Vec<ResourceAction>, BuildError> {
    let malformed = |reason: &'static str| BuildError::MalformedMarker {
        template: template.to_string(),
        reason,
    };

    let (kind, list) = match marker.find('[') {
        Some(open) => {
            let close = marker.rfind(']').ok_or_else(|| malformed("unterminated `[`"))?;
            if close < open {
                return Err(malformed("unterminated `[`"));
            }
            if close != marker.len() - 1 {
                return Err(malformed("text after `]`"));
            }
            (&marker[..open], Some(&marker[open + 1..close]))
        }
        None if marker.contains(']') => return Err(malformed("unbalanced `]`")),
        None => (marker, None),
    };

    if kind.contains('/') {
        return Err(malformed("marker must be the final segment"));
    }

    let canonical = || {
        CANONICAL_ACTIONS
            .iter()
            .map(|name| ResourceAction {
                name: name.to_string(),
                verb: None,
            })
            .collect::<Vec<_>>()
    };

    match (kind, list) {
        ("rest", None) => Ok(canonical()),
        ("rest", Some(list)) => {
            let mut actions = canonical();
            actions.extend(parse_action_list(template, list)?);
            Ok(actions)
        }
        ("", Some(list)) => parse_action_list(template, list),
        ("", None) => Err(malformed("empty marker")),
        _ => Err(malformed("unknown marker")),
    }
}

fn parse_action_list(template: &str, list: &str) -> Result<Vec<ResourceAction>, BuildError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, verb) = match entry.split_once('@') {
                Some((name, verb)) => {
                    let verb = verb.trim().parse::<Verb>().map_err(|_| {
                        BuildError::UnknownVerb {
                            template: template.to_string(),
                            verb: verb.to_string(),
                        }
                    })?;
                    (name.trim(), Some(verb))
                }
                None => (entry, None),
            };

            if name.is_empty() || name.contains(&['/', '@', ':', '%'][..]) {
                return Err(BuildError::MalformedMarker {
                    template: template.to_string(),
                    reason: "invalid action name",
                });
            }

            Ok(ResourceAction {
                name: name.to_string(),
                verb,
            })
        })
        .collect()
}

/// Trailing segments and verb for one resource action.
fn action_tail(action: &ResourceAction) -> (Vec<Segment>, Verb) {
    if action.verb.is_none() {
        if let Some(tail) = canonical_tail(&action.name) {
            return tail;
        }
    }
    (
        vec![Segment::Literal(action.name.clone())],
        action.verb.unwrap_or_default(),
    )
}

fn canonical_tail(name: &str) -> Option<(Vec<Segment>, Verb)> {
    let id = || Segment::Param("id".to_string());
    let lit = |s: &str| Segment::Literal(s.to_string());

    let tail = match name {
        "index" => (vec![], Verb::Get),
        "show" => (vec![id()], Verb::Get),
        "new" => (vec![lit("new")], Verb::Get),
        "create" => (vec![lit("new")], Verb::Post),
        "edit" => (vec![id(), lit("edit")], Verb::Get),
        "update" => (vec![id()], Verb::Patch),
        "destroy" => (vec![id()], Verb::Delete),
        _ => return None,
    };
    Some(tail)
}

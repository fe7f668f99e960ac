//! Transport-neutral request view.
//!
//! # Responsibilities
//! - Carry what actions may read: path info, verb, host, scheme, mount
//!   prefix, query string and urlencoded form fields
//! - Map an HTTP method (plus the `_method` form field) to a routable verb
//! - Strip the mount prefix from the URI path
//!
//! # Design Decisions
//! - Built by the axum adapter, but constructible directly so the
//!   dispatcher can be driven without a socket
//! - An unroutable method keeps `verb = None` and resolves to not-found

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::Verb;

/// Form field that overrides a POST with another verb.
pub const METHOD_OVERRIDE_FIELD: &str = "_method";

/// Request as seen by the dispatcher and actions.
#[derive(Debug, Clone, Default)]
pub struct Request {
    path: String,
    verb: Option<Verb>,
    host: String,
    secure: bool,
    base_url: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
}

impl Request {
    pub fn new(verb: impl Into<Option<Verb>>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            verb: verb.into(),
            host: "localhost".to_string(),
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.form
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Path info, mount prefix already removed.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `None` when the HTTP method has no routable verb.
    pub fn verb(&self) -> Option<Verb> {
        self.verb
    }

    pub fn is_post(&self) -> bool {
        self.verb == Some(Verb::Post)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    /// Absolute URL for a path below the mount prefix.
    pub fn absolute_url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}://{}{}/{}", self.scheme(), self.host, self.base_url, path)
    }
}

/// Routable verb for an HTTP method.
///
/// A POST whose form carries `_method=DELETE` or `_method=PATCH` is treated
/// as that verb. Methods outside GET/POST/PATCH/DELETE have no verb.
pub fn verb_from_method(method: &Method, form: &HashMap<String, String>) -> Option<Verb> {
    match *method {
        Method::GET => Some(Verb::Get),
        Method::PATCH => Some(Verb::Patch),
        Method::DELETE => Some(Verb::Delete),
        Method::POST => match form.get(METHOD_OVERRIDE_FIELD).map(|m| m.to_ascii_uppercase()) {
            Some(m) if m == "DELETE" => Some(Verb::Delete),
            Some(m) if m == "PATCH" => Some(Verb::Patch),
            _ => Some(Verb::Post),
        },
        _ => None,
    }
}

/// Remove the mount prefix from a URI path. Always returns a path starting with `/`.
pub fn path_info(uri_path: &str, base_url: &str) -> String {
    let rest = match uri_path.strip_prefix(base_url) {
        Some(rest) if !base_url.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => uri_path,
    };
    if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{}", rest)
    }
}

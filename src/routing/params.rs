//! Resolved route parameters.

use std::collections::BTreeMap;

use serde::Serialize;

/// Prefix marking routing-internal metadata keys.
pub const INTERNAL_PREFIX: &str = "_";

/// Reserved key carrying the handler identifier.
pub const CONTROLLER_KEY: &str = "_controller";

/// Reserved key carrying the action identifier.
pub const ACTION_KEY: &str = "_action";

/// Route metadata key that puts every action behind authentication.
pub const AUTH_METADATA: &str = "auth";

/// Parameters produced by one successful resolution.
///
/// Holds the route's prefixed metadata (`_controller`, `_action`, ...) merged
/// with the decoded named captures. Owned by the dispatcher for the duration
/// of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RouteParams {
    values: BTreeMap<String, String>,
}

impl RouteParams {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Parameters naming a target directly, with nothing captured.
    pub fn for_target(controller: &str, action: &str) -> Self {
        let mut values = BTreeMap::new();
        values.insert(CONTROLLER_KEY.to_string(), controller.to_string());
        values.insert(ACTION_KEY.to_string(), action.to_string());
        Self { values }
    }

    pub fn controller(&self) -> Option<&str> {
        self.get(CONTROLLER_KEY)
    }

    pub fn action(&self) -> Option<&str> {
        self.get(ACTION_KEY)
    }

    /// Raw lookup by key, internal keys included.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Route metadata by its authored (unprefixed) name.
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.get(&format!("{}{}", INTERNAL_PREFIX, key))
    }

    /// Whether the route was declared with `auth = true`.
    pub fn requires_auth(&self) -> bool {
        self.metadata(AUTH_METADATA) == Some("true")
    }

    /// Captured path parameters only, without internal keys.
    pub fn captures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(|(k, _)| !k.starts_with(INTERNAL_PREFIX))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_and_captured_keys() {
        let mut values = BTreeMap::new();
        values.insert("_controller".to_string(), "posts".to_string());
        values.insert("_action".to_string(), "show".to_string());
        values.insert("_layout".to_string(), "wide".to_string());
        values.insert("id".to_string(), "42".to_string());
        let params = RouteParams::new(values);

        assert_eq!(params.controller(), Some("posts"));
        assert_eq!(params.action(), Some("show"));
        assert_eq!(params.metadata("layout"), Some("wide"));
        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.captures().collect::<Vec<_>>(), vec![("id", "42")]);
        assert!(!params.requires_auth());
    }

    #[test]
    fn test_auth_metadata() {
        let mut values = BTreeMap::new();
        values.insert("_auth".to_string(), "true".to_string());
        assert!(RouteParams::new(values.clone()).requires_auth());

        values.insert("_auth".to_string(), "false".to_string());
        assert!(!RouteParams::new(values).requires_auth());
    }

    #[test]
    fn test_for_target_has_no_captures() {
        let params = RouteParams::for_target("login", "index");
        assert_eq!(params.controller(), Some("login"));
        assert_eq!(params.captures().count(), 0);
        assert_eq!(params.len(), 2);
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for an
//! application. All types derive Serde traits for deserialization from
//! config files.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::routing::RouteDefinition;
use crate::security::csrf::{DEFAULT_CAPACITY, DEFAULT_EXPIRY_SECS, DEFAULT_TOKEN_LENGTH};
use crate::session::DEFAULT_MAX_IDLE_SECS;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Debug mode: not-found pages show the detailed reason.
    pub debug: bool,

    /// Mount prefix stripped from request paths (e.g. "/app"). Empty = root.
    pub base_url: String,

    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// CSRF token settings.
    pub csrf: CsrfConfig,

    /// Where unauthenticated requests for protected actions are sent.
    pub login: Option<LoginConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Route definitions in declaration order.
    pub routes: IndexMap<String, BTreeMap<String, MetadataValue>>,
}

impl AppConfig {
    /// Route definitions as authored, in file order.
    pub fn route_definitions(&self) -> Vec<RouteDefinition> {
        self.routes
            .iter()
            .map(|(template, metadata)| {
                RouteDefinition::new(
                    template.clone(),
                    metadata.iter().map(|(k, v)| (k.clone(), v.to_string())),
                )
            })
            .collect()
    }
}

/// A scalar metadata value. Non-string scalars are kept in their TOML spelling.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    Integer(i64),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => f.write_str(s),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Integer(i) => write!(f, "{}", i),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub cookie_path: String,
    /// Send the cookie over HTTPS only.
    pub secure: bool,
    pub http_only: bool,

    /// Seconds a stored session may go unused before it expires.
    pub max_idle_secs: u64,

    /// How often expired sessions are purged, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "SWITCHYARD_SESSION".to_string(),
            cookie_path: "/".to_string(),
            secure: false,
            http_only: true,
            max_idle_secs: DEFAULT_MAX_IDLE_SECS,
            sweep_interval_secs: 60,
        }
    }
}

/// CSRF token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Outstanding tokens kept per form identity.
    pub capacity: usize,

    /// Token lifetime in seconds.
    pub expire_secs: u64,

    /// Random bytes per token.
    pub token_length: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            expire_secs: DEFAULT_EXPIRY_SECS,
            token_length: DEFAULT_TOKEN_LENGTH,
        }
    }
}

/// Login fallback target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoginConfig {
    pub controller: String,
    pub action: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(!config.debug);
        assert_eq!(config.csrf.capacity, 10);
        assert_eq!(config.csrf.expire_secs, 1800);
        assert_eq!(config.csrf.token_length, 32);
        assert_eq!(config.session.max_idle_secs, 1800);
        assert_eq!(config.session.sweep_interval_secs, 60);
        assert!(config.login.is_none());
        assert!(config.routes.is_empty());
    }

    #[test]
    fn test_routes_keep_file_order_and_stringify_scalars() {
        let config: AppConfig = toml::from_str(
            r#"
            [login]
            controller = "account"
            action = "login"

            [routes]
            "/login@get" = { controller = "account", action = "login" }
            "/login@post" = { controller = "account", action = "authenticate" }
            "/admin/%rest" = { controller = "admin", auth = true, weight = 3 }
            "#,
        )
        .unwrap();

        let defs = config.route_definitions();
        let templates: Vec<&str> = defs.iter().map(|d| d.template.as_str()).collect();
        assert_eq!(templates, vec!["/login@get", "/login@post", "/admin/%rest"]);
        assert_eq!(defs[2].metadata["auth"], "true");
        assert_eq!(defs[2].metadata["weight"], "3");
        assert_eq!(
            config.login,
            Some(LoginConfig {
                controller: "account".into(),
                action: "login".into()
            })
        );
    }
}

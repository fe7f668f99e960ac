//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, session lifetimes > 0, addresses parse)
//! - Compile the route table once so malformed templates fail here
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::routing::{BuildError, RouteTable};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("base_url `{0}` must be empty or start with `/` without a trailing `/`")]
    BaseUrl(String),

    #[error("session.cookie_name must not be empty")]
    EmptyCookieName,

    #[error("session.max_idle_secs must be greater than zero")]
    SessionMaxIdle,

    #[error("session.sweep_interval_secs must be greater than zero")]
    SessionSweepInterval,

    #[error("csrf.capacity must be greater than zero")]
    CsrfCapacity,

    #[error("csrf.token_length must be greater than zero")]
    CsrfTokenLength,

    #[error("login.controller and login.action must both be set")]
    IncompleteLogin,

    #[error(transparent)]
    Routes(#[from] BuildError),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let base = &config.base_url;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
        errors.push(ValidationError::BaseUrl(base.clone()));
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }

    if config.session.max_idle_secs == 0 {
        errors.push(ValidationError::SessionMaxIdle);
    }

    if config.session.sweep_interval_secs == 0 {
        errors.push(ValidationError::SessionSweepInterval);
    }

    if config.csrf.capacity == 0 {
        errors.push(ValidationError::CsrfCapacity);
    }

    if config.csrf.token_length == 0 {
        errors.push(ValidationError::CsrfTokenLength);
    }

    if let Some(login) = &config.login {
        if login.controller.trim().is_empty() || login.action.trim().is_empty() {
            errors.push(ValidationError::IncompleteLogin);
        }
    }

    if let Err(e) = RouteTable::build(config.route_definitions()) {
        errors.push(e.into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LoginConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.base_url = "app/".into();
        config.csrf.capacity = 0;
        config.csrf.token_length = 0;
        config.session.cookie_name = " ".into();
        config.session.max_idle_secs = 0;
        config.session.sweep_interval_secs = 0;
        config.login = Some(LoginConfig {
            controller: "account".into(),
            action: String::new(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 8);
    }

    #[test]
    fn test_malformed_route_is_reported() {
        let mut config = AppConfig::default();
        let mut meta = std::collections::BTreeMap::new();
        meta.insert(
            "controller".to_string(),
            crate::config::schema::MetadataValue::String("x".into()),
        );
        config.routes.insert("/x/:".to_string(), meta);

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::Routes(BuildError::InvalidParam { .. })));
    }
}

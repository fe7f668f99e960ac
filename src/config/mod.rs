//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, route table compiles)
//!     → AppConfig (validated, immutable)
//!     → lifecycle::startup builds the router, CSRF manager, and server
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - `[routes]` keeps file order because route order decides matching

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, CsrfConfig, ListenerConfig, LogFormat, LoginConfig, MetadataValue,
    ObservabilityConfig, SecurityConfig, SessionConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};

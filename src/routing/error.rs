//! Route table build errors.

use thiserror::Error;

/// A malformed route definition.
///
/// Raised while the route table is built. Always fatal: the process must not
/// start serving with a partially compiled table.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("route `{template}`: template must start with `/`")]
    MissingLeadingSlash { template: String },

    #[error("route `{template}`: invalid parameter name `{name}`")]
    InvalidParam { template: String, name: String },

    #[error("route `{template}`: parameter `{name}` is captured twice")]
    DuplicateParam { template: String, name: String },

    #[error("route `{template}`: more than one `@verb` suffix")]
    MultipleVerbs { template: String },

    #[error("route `{template}`: `@verb` must close the final segment")]
    MisplacedVerb { template: String },

    #[error("route `{template}`: unsupported verb `{verb}`")]
    UnknownVerb { template: String, verb: String },

    #[error("route `{template}`: malformed resource marker ({reason})")]
    MalformedMarker {
        template: String,
        reason: &'static str,
    },

    #[error("route `{template}`: metadata is missing `{key}`")]
    MissingMetadata { template: String, key: &'static str },

    #[error("route `{template}`: pattern failed to compile: {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl BuildError {
    /// The template the error was raised for.
    pub fn template(&self) -> &str {
        match self {
            BuildError::MissingLeadingSlash { template }
            | BuildError::InvalidParam { template, .. }
            | BuildError::DuplicateParam { template, .. }
            | BuildError::MultipleVerbs { template }
            | BuildError::MisplacedVerb { template }
            | BuildError::UnknownVerb { template, .. }
            | BuildError::MalformedMarker { template, .. }
            | BuildError::MissingMetadata { template, .. }
            | BuildError::Pattern { template, .. } => template,
        }
    }
}

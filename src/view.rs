//! View collaborator interface.
//!
//! Templating is not part of this crate. Actions hand a template name and a
//! JSON object of variables to a [`Renderer`]; applications plug in their
//! own engine. [`PlainRenderer`] is the default and is what tests use.

use thiserror::Error;

/// Failure raised by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template `{0}` not found")]
    TemplateNotFound(String),

    #[error("failed to render `{template}`: {reason}")]
    Failed { template: String, reason: String },
}

pub trait Renderer: Send + Sync + 'static {
    /// Render `template`, optionally wrapped in `layout`.
    fn render(
        &self,
        template: &str,
        layout: Option<&str>,
        vars: &serde_json::Value,
    ) -> Result<String, RenderError>;

    /// Body of the fixed not-found page.
    fn render_not_found(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Writes the template name followed by the variables as JSON.
///
/// Messages are emitted as JSON strings and never interpreted as markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(
        &self,
        template: &str,
        layout: Option<&str>,
        vars: &serde_json::Value,
    ) -> Result<String, RenderError> {
        let body = serde_json::to_string(vars).map_err(|e| RenderError::Failed {
            template: template.to_string(),
            reason: e.to_string(),
        })?;
        Ok(match layout {
            Some(layout) => format!("{layout}:{template}\n{body}"),
            None => format!("{template}\n{body}"),
        })
    }
}

use thiserror::Error;

use crate::domain::schema::Record;

/// A prompt template failed to render.
#[derive(Debug, Clone, Error)]
#[error("Failed to render template for flow '{flow}': {reason}")]
pub struct RenderError {
    /// Flow whose template failed.
    pub flow: String,
    /// Engine-reported reason.
    pub reason: String,
}

/// Trait for rendering prompt templates.
///
/// This abstraction keeps the template engine (e.g. minijinja) out of the
/// domain layer. Implementations must be deterministic and side-effect free:
/// identical template and input produce identical prompt text, and a
/// placeholder referencing an absent field renders as the empty string.
pub trait TemplateRenderer {
    /// Render a template string with the validated input record.
    ///
    /// # Arguments
    /// * `template` - The template source to render.
    /// * `input` - The validated (and default-backfilled) flow input.
    /// * `flow` - The owning flow's name, for error reporting.
    fn render(&self, template: &str, input: &Record, flow: &str) -> Result<String, RenderError>;
}

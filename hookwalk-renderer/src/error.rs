//! Error types for hookwalk-renderer.

use thiserror::Error;

/// All errors that can arise from rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template referenced a name that no context tier defines.
    #[error("undefined variable '{name}' in template '{template}'")]
    UndefinedVariable { name: String, template: String },

    /// Any other template engine failure (syntax, filter, type errors).
    #[error("failed to render '{template}': {message}")]
    Template { template: String, message: String },

    /// JSON conversion error (building the tera context or decoding a value).
    #[error("context serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RenderError {
    pub fn is_undefined(&self) -> bool {
        matches!(self, RenderError::UndefinedVariable { .. })
    }
}

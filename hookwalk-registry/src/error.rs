//! Error types for hookwalk-registry.

use std::path::PathBuf;

use thiserror::Error;

use hookwalk_renderer::RenderError;

/// Resolution, provider, and cache errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No scope defines the requested type.
    #[error("unknown hook type '{name}'; available: {}", .available.join(", "))]
    UnknownHookType { name: String, available: Vec<String> },

    /// Two descriptors with the same type name in one scope.
    #[error("hook type '{name}' is already registered in {scope} scope")]
    DuplicateHook { name: String, scope: String },

    /// A hook definition file is structurally wrong.
    #[error("invalid hook definition in {path}: {message}")]
    InvalidDefinition { path: PathBuf, message: String },

    /// A provider reference could not be interpreted.
    #[error("invalid provider reference '{reference}': {message}")]
    InvalidProviderRef { reference: String, message: String },

    /// Fetching a remote provider failed.
    #[error("failed to fetch provider {url}: {message}")]
    Fetch { url: String, message: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the file path.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Provider metadata JSON error.
    #[error("provider metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a hook while building or executing.
#[derive(Debug, Error)]
pub enum HookError {
    /// Validated fields did not deserialize into the hook type.
    #[error("invalid hook fields: {0}")]
    Construct(#[source] serde_yaml::Error),

    /// Lazy rendering inside a hook failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// A hook rejected its input.
    #[error("{0}")]
    Invalid(String),

    /// Spawning or talking to a child process failed.
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading interactive input failed.
    #[error("failed to read input: {0}")]
    Input(#[source] std::io::Error),
}

/// Convenience constructor for [`RegistryError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.into(),
        source,
    }
}

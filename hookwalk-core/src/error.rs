//! Error types for hookwalk-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from context and settings operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A strict lookup found the name in no tier.
    #[error("undefined name '{name}'")]
    UndefinedName { name: String },

    /// A write targeted the temporary tier while no scope was open.
    #[error("no scope is open; cannot write temporary key '{key}'")]
    NoScope { key: String },

    /// `pop_scope` was called on an empty scope stack.
    #[error("scope stack underflow")]
    ScopeUnderflow,

    /// A key path walked through a value that is not a container.
    #[error("cannot write '{path}': '{at}' is not a mapping or sequence")]
    NotAContainer { path: String, at: String },

    /// A sequence index was past the end (only `len` appends).
    #[error("cannot write '{path}': index {index} is out of bounds (len {len})")]
    IndexOutOfBounds { path: String, index: usize, len: usize },

    /// Filesystem error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error with the offending file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}

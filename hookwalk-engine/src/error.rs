//! Error types for hookwalk-engine.

use std::path::PathBuf;

use thiserror::Error;

use hookwalk_core::{CoreError, KeyPath};
use hookwalk_registry::{HookError, RegistryError};
use hookwalk_renderer::RenderError;

fn type_suffix(hook_type: &Option<String>) -> String {
    hook_type
        .as_deref()
        .map(|t| format!(" (hook '{t}')"))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Any failure inside a node, annotated with where it happened.
    #[error("error at '{key_path}'{}: {source}", type_suffix(.hook_type))]
    HookCall {
        key_path: String,
        hook_type: Option<String>,
        #[source]
        source: Box<EngineError>,
    },

    /// A node's shape is ambiguous or malformed.
    #[error("cannot interpret '{key_path}': {message}")]
    Classify { key_path: String, message: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Core(#[from] CoreError),

    /// Bad arguments to a hook call: missing, unknown, or of the wrong kind.
    #[error("invalid input at '{key_path}': {message}")]
    Input { key_path: String, message: String },

    #[error("cannot merge at '{key_path}': {message}")]
    Merge { key_path: String, message: String },

    /// A hook reported a soft failure and `ignore_error` was not set.
    #[error("hook '{hook_type}' failed: {cause}")]
    Failed { hook_type: String, cause: String },

    /// The document source could not be located.
    #[error("{message}")]
    Source { message: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    /// Annotate with a key path and hook type. An error that already
    /// carries a location keeps the innermost one.
    pub fn at(self, key_path: &KeyPath, hook_type: Option<&str>) -> Self {
        if matches!(self, EngineError::HookCall { .. }) {
            return self;
        }
        EngineError::HookCall {
            key_path: key_path.to_string(),
            hook_type: hook_type.map(str::to_owned),
            source: Box::new(self),
        }
    }

    /// The error beneath any location wrappers.
    pub fn root_cause(&self) -> &EngineError {
        match self {
            EngineError::HookCall { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Key path of the failing node, if known.
    pub fn key_path(&self) -> Option<&str> {
        match self {
            EngineError::HookCall { key_path, .. }
            | EngineError::Classify { key_path, .. }
            | EngineError::Input { key_path, .. }
            | EngineError::Merge { key_path, .. } => Some(key_path),
            _ => None,
        }
    }

    pub fn is_undefined_variable(&self) -> bool {
        match self.root_cause() {
            EngineError::Render(e) | EngineError::Hook(HookError::Render(e)) => e.is_undefined(),
            _ => false,
        }
    }
}

/// Convenience constructor for [`EngineError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn innermost_location_wins() {
        let inner = EngineError::Failed { hook_type: "command".into(), cause: "exit 1".into() }
            .at(&KeyPath::from("a.b"), Some("command"));
        let outer = inner.at(&KeyPath::from("a"), Some("block"));
        assert_eq!(outer.key_path(), Some("a.b"));
        let msg = outer.to_string();
        assert!(msg.contains("'a.b'") && msg.contains("hook 'command'"), "got: {msg}");
        assert!(matches!(outer.root_cause(), EngineError::Failed { .. }));
    }

    #[test]
    fn undefined_variables_are_recognized_through_wrappers() {
        let e = EngineError::Render(RenderError::UndefinedVariable {
            name: "b".into(),
            template: "{{ b }}".into(),
        })
        .at(&KeyPath::from("a"), Some("var"));
        assert!(e.is_undefined_variable());
    }
}

//! The hook contract.
//!
//! A hook type is described by a [`HookDescriptor`]: where it came from, a
//! [`HookSchema`] the walker validates fields against, and a [`HookImpl`]
//! that either builds a native [`Hook`] from the validated fields or is one
//! of the walker's intrinsics (blocks, declarative hooks).

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use hookwalk_core::{ContextStore, KeyPath, Mapping, Value};
use hookwalk_renderer::Renderer;

use crate::declarative::DeclarativeHook;
use crate::error::HookError;

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Result of a hook that ran to completion. `Failure` is a soft failure
/// (non-zero exit and the like) that `ignore_error` may turn into success.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    Success(Value),
    Failure { output: Value, cause: String },
}

/// What a running hook can see.
pub struct ExecEnv<'a> {
    pub context: &'a ContextStore,
    pub renderer: &'a dyn Renderer,
    pub key_path: &'a KeyPath,
    pub no_input: bool,
}

impl ExecEnv<'_> {
    /// Render a value lazily, for fields declared with `render: false`.
    pub fn render(&self, value: &Value) -> Result<Value, HookError> {
        Ok(self.renderer.render_value(value, self.context)?)
    }
}

pub trait Hook {
    fn exec(&self, env: &mut ExecEnv<'_>) -> Result<HookOutcome, HookError>;
}

/// Builds a hook instance from validated fields.
pub type HookCtor = Arc<dyn Fn(&Mapping) -> Result<Box<dyn Hook>, HookError> + Send + Sync>;

/// Constructor for any hook that deserializes from its fields.
pub fn native<H>() -> HookCtor
where
    H: Hook + DeserializeOwned + 'static,
{
    Arc::new(|fields: &Mapping| {
        let hook: H = serde_yaml::from_value(Value::Mapping(fields.clone()))
            .map_err(HookError::Construct)?;
        Ok(Box::new(hook) as Box<dyn Hook>)
    })
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Any,
    #[serde(alias = "string")]
    Str,
    #[serde(alias = "boolean")]
    Bool,
    #[serde(alias = "integer")]
    Int,
    #[serde(alias = "number")]
    Float,
    #[serde(alias = "sequence")]
    List,
    #[serde(alias = "dict", alias = "mapping")]
    Map,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::Any => "any",
            FieldKind::Str => "str",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::List => "list",
            FieldKind::Map => "map",
        };
        f.write_str(s)
    }
}

impl FieldKind {
    /// Check `value` against this kind, applying the scalar coercions a
    /// rendered template needs (`"3"` → `3` for ints, numbers → strings).
    pub fn coerce(self, value: Value) -> Result<Value, String> {
        let mismatch = |v: &Value| {
            let shown = serde_yaml::to_string(v).unwrap_or_default();
            format!("expected {self}, got {}", shown.trim_end())
        };
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (FieldKind::Any, v) => Ok(v),
            (FieldKind::Str, Value::String(s)) => Ok(Value::String(s)),
            (FieldKind::Str, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (FieldKind::Str, Value::Bool(b)) => Ok(Value::String(b.to_string())),
            (FieldKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (FieldKind::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "n" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(mismatch(&Value::String(s))),
            },
            (FieldKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
            (FieldKind::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| mismatch(&Value::String(s))),
            (FieldKind::Float, Value::Number(n)) => Ok(Value::Number(n)),
            (FieldKind::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| mismatch(&Value::String(s))),
            (FieldKind::List, Value::Sequence(items)) => Ok(Value::Sequence(items)),
            (FieldKind::Map, Value::Mapping(m)) => Ok(Value::Mapping(m)),
            (_, other) => Err(mismatch(&other)),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub default: Option<Value>,
    pub required: bool,
    /// A bare string is treated as an expression (`x` renders as `{{ x }}`).
    pub render_by_default: bool,
    /// `false` passes the raw value through for the hook to render lazily.
    pub render: bool,
    pub help: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            required: false,
            render_by_default: false,
            render: true,
            help: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn render_by_default(mut self) -> Self {
        self.render_by_default = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.render = false;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Field declarations plus positional-argument order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookSchema {
    pub fields: Vec<FieldSpec>,
    /// Field names that positional args fill, in order. The last one
    /// absorbs any surplus args when it is a string field.
    pub args: Vec<String>,
    /// Accept fields the schema does not declare.
    pub extra_fields: bool,
    /// Values produced by this hook are recorded for replay.
    pub interactive: bool,
    pub help: Option<String>,
}

impl HookSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn args<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn extra_fields(mut self) -> Self {
        self.extra_fields = true;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookSource {
    Builtin,
    /// A hook file next to a document.
    Local(PathBuf),
    Provider {
        name: String,
        revision: Option<String>,
    },
}

impl fmt::Display for HookSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookSource::Builtin => f.write_str("builtin"),
            HookSource::Local(path) => write!(f, "local ({})", path.display()),
            HookSource::Provider { name, revision: Some(rev) } => write!(f, "{name}@{rev}"),
            HookSource::Provider { name, revision: None } => f.write_str(name),
        }
    }
}

#[derive(Clone)]
pub enum HookImpl {
    Native(HookCtor),
    /// Walk the `items` field in a fresh block scope.
    Block,
    Declarative(Arc<DeclarativeHook>),
}

impl fmt::Debug for HookImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookImpl::Native(_) => f.write_str("Native(..)"),
            HookImpl::Block => f.write_str("Block"),
            HookImpl::Declarative(d) => f.debug_tuple("Declarative").field(d).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookDescriptor {
    pub type_name: String,
    pub source: HookSource,
    pub schema: HookSchema,
    pub implementation: HookImpl,
}

impl HookDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        source: HookSource,
        schema: HookSchema,
        implementation: HookImpl,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            source,
            schema,
            implementation,
        }
    }
}

//! Document types shared by every hookwalk crate.
//!
//! Documents are plain `serde_yaml` values; [`Mapping`] keeps keys in
//! declaration order, which the walker relies on.

use std::fmt;

pub use serde_yaml::{Mapping, Value};

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Which output tier a key writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    /// `_name` is private; everything else is public.
    pub fn of_key(key: &str) -> Self {
        if key.starts_with('_') {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

/// `__name` keys are directives consumed before the walk.
pub fn is_directive(key: &str) -> bool {
    key.starts_with("__")
}

/// Stringify a mapping key. Only scalar keys have a string form.
pub fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Key paths
// ---------------------------------------------------------------------------

/// One step into a document: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => k.fmt(f),
            Segment::Index(i) => i.fmt(f),
        }
    }
}

/// Location of a node, rendered as `a.b.0` in errors and record files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(pub Vec<Segment>);

impl KeyPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn first(&self) -> Option<&Segment> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Key(key.into()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }

    /// The path with its last segment removed (root stays root).
    pub fn parent(&self) -> Self {
        let mut next = self.clone();
        next.0.pop();
        next
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            seg.fmt(f)?;
        }
        Ok(())
    }
}

impl From<&str> for KeyPath {
    fn from(s: &str) -> Self {
        Self(
            s.split('.')
                .filter(|p| !p.is_empty())
                .map(|p| match p.parse::<usize>() {
                    Ok(i) => Segment::Index(i),
                    Err(_) => Segment::Key(p.to_owned()),
                })
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Hook calls
// ---------------------------------------------------------------------------

/// Execution options accepted on every hook call. Values stay unrendered
/// until the walker reaches the call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Control {
    pub when: Option<Value>,
    pub else_value: Option<Value>,
    pub loop_over: Option<Value>,
    /// Per-iteration filter (`if`).
    pub filter: Option<Value>,
    pub reverse: Option<Value>,
    pub merge: Option<Value>,
    pub chdir: Option<Value>,
    pub ignore_error: Option<Value>,
    /// Catch any error from the call (`try`).
    pub try_: Option<Value>,
    /// Walked in place of the result when a `try` call fails.
    pub except: Option<Value>,
    /// Extra fields supplied as a mapping or an expression (`kwargs`).
    pub kwargs: Option<Value>,
}

impl Control {
    pub const FIELDS: &'static [&'static str] = &[
        "when",
        "else",
        "loop",
        "if",
        "reverse",
        "merge",
        "chdir",
        "ignore_error",
        "try",
        "except",
        "kwargs",
    ];

    pub fn is_control_field(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }

    /// Store `value` under the control field `name`. Returns `false` when
    /// `name` is not a control field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        let slot = match name {
            "when" => &mut self.when,
            "else" => &mut self.else_value,
            "loop" => &mut self.loop_over,
            "if" => &mut self.filter,
            "reverse" => &mut self.reverse,
            "merge" => &mut self.merge,
            "chdir" => &mut self.chdir,
            "ignore_error" => &mut self.ignore_error,
            "try" => &mut self.try_,
            "except" => &mut self.except,
            "kwargs" => &mut self.kwargs,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// A canonicalized hook call, produced by the node classifier and consumed
/// once by the walker.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HookCall {
    pub hook_type: String,
    /// Positional arguments, mapped onto the hook's declared `args` order.
    pub args: Vec<Value>,
    /// Named fields, unrendered.
    pub kwargs: Mapping,
    pub control: Control,
}

impl HookCall {
    pub fn new(hook_type: impl Into<String>) -> Self {
        Self {
            hook_type: hook_type.into(),
            ..Self::default()
        }
    }
}

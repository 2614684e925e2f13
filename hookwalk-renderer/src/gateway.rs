//! The [`Renderer`] trait and the helpers every implementation shares.

use hookwalk_core::{ContextStore, Mapping, Value};

use crate::error::RenderError;

/// `true` if `s` contains template markup.
pub fn is_template(s: &str) -> bool {
    s.contains("{{") || s.contains("{%")
}

/// If `s` is exactly one `{{ expr }}` and nothing else, return `expr`.
pub fn single_expression(s: &str) -> Option<&str> {
    let inner = s.trim().strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") || inner.contains("{%") {
        return None;
    }
    Some(inner.trim())
}

/// Truthiness used by `when`, `if`, and boolean control flags.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => {
            let t = s.trim();
            !(t.is_empty() || t.eq_ignore_ascii_case("false"))
        }
        Value::Sequence(items) => !items.is_empty(),
        Value::Mapping(m) => !m.is_empty(),
        Value::Tagged(t) => truthy(&t.value),
    }
}

/// Render gateway over the context store.
///
/// A template that is a single `{{ expr }}` renders to the expression's
/// native value (list, mapping, number); anything else renders to a string.
pub trait Renderer {
    /// Render one template string.
    fn render_str(&self, template: &str, ctx: &ContextStore) -> Result<Value, RenderError>;

    /// Evaluate a bare expression (no delimiters) to a native value.
    fn evaluate(&self, expression: &str, ctx: &ContextStore) -> Result<Value, RenderError>;

    /// Recursively render every templated string inside `value`.
    fn render_value(&self, value: &Value, ctx: &ContextStore) -> Result<Value, RenderError> {
        match value {
            Value::String(s) if is_template(s) => self.render_str(s, ctx),
            Value::Sequence(items) => items
                .iter()
                .map(|v| self.render_value(v, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Mapping(m) => {
                let mut out = Mapping::new();
                for (k, v) in m {
                    out.insert(k.clone(), self.render_value(v, ctx)?);
                }
                Ok(Value::Mapping(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Evaluate a condition. Strings without delimiters are treated as bare
    /// expressions; a list holds only if every element holds.
    fn condition(&self, value: &Value, ctx: &ContextStore) -> Result<bool, RenderError> {
        match value {
            Value::String(s) => {
                let v = match single_expression(s) {
                    Some(expr) => self.evaluate(expr, ctx)?,
                    None if is_template(s) => self.render_str(s, ctx)?,
                    None => self.evaluate(s, ctx)?,
                };
                Ok(truthy(&v))
            }
            Value::Sequence(items) => {
                for item in items {
                    if !self.condition(item, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            other => Ok(truthy(other)),
        }
    }
}

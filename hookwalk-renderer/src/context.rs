//! Conversion between document values and the tera rendering context.

use hookwalk_core::types::key_to_string;
use hookwalk_core::{ContextStore, Mapping, Value};

use crate::error::RenderError;

/// YAML → JSON. Non-scalar mapping keys are serialized to their YAML text.
pub fn to_json(v: &Value) -> serde_json::Value {
    use serde_json::Value as J;
    match v {
        Value::Null => J::Null,
        Value::Bool(b) => J::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                J::from(i)
            } else if let Some(u) = n.as_u64() {
                J::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(J::Number)
                    .unwrap_or(J::Null)
            }
        }
        Value::String(s) => J::String(s.clone()),
        Value::Sequence(items) => J::Array(items.iter().map(to_json).collect()),
        Value::Mapping(m) => J::Object(
            m.iter()
                .map(|(k, v)| {
                    let key = key_to_string(k).unwrap_or_else(|| {
                        serde_yaml::to_string(k)
                            .map(|s| s.trim_end().to_owned())
                            .unwrap_or_default()
                    });
                    (key, to_json(v))
                })
                .collect(),
        ),
        Value::Tagged(t) => to_json(&t.value),
    }
}

/// JSON → YAML.
pub fn from_json(j: serde_json::Value) -> Value {
    use serde_json::Value as J;
    match j {
        J::Null => Value::Null,
        J::Bool(b) => Value::Bool(b),
        J::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
        }
        J::String(s) => Value::String(s),
        J::Array(items) => Value::Sequence(items.into_iter().map(from_json).collect()),
        J::Object(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                out.insert(Value::String(k), from_json(v));
            }
            Value::Mapping(out)
        }
    }
}

/// Build a tera context from every visible tier of `store`.
pub fn tera_context(store: &ContextStore) -> Result<tera::Context, RenderError> {
    let json = to_json(&Value::Mapping(store.snapshot()));
    tera::Context::from_value(json).map_err(|e| RenderError::Template {
        template: String::new(),
        message: e.to_string(),
    })
}

/// Split a dotted variable reference (`a.b.0`, `a["b"]` is not accepted).
/// Returns `None` unless every part is an identifier or an index.
pub fn variable_path(expr: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = expr.split('.').collect();
    let first = parts.first()?;
    let is_ident = |p: &str| {
        let mut chars = p.chars();
        matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
            && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
    };
    if !is_ident(first) {
        return None;
    }
    let rest_ok = parts[1..]
        .iter()
        .all(|p| is_ident(p) || (!p.is_empty() && p.chars().all(|c| c.is_ascii_digit())));
    rest_ok.then_some(parts)
}

/// Resolve a dotted variable reference against `store` without going
/// through tera. Preserves mapping order and exact value types.
pub fn resolve_path<'a>(store: &'a ContextStore, parts: &[&str]) -> Option<&'a Value> {
    let (first, rest) = parts.split_first()?;
    let mut cur = store.lookup(first)?;
    for part in rest {
        cur = match cur {
            Value::Mapping(m) => m.get(*part)?,
            Value::Sequence(s) => s.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

//! Node classification and macro expansion.
//!
//! Every mapping entry becomes an [`Entry`]: either plain data or a
//! canonical [`HookCall`]. The accepted call shapes:
//!
//! ```yaml
//! a: {type: var, input: "{{ b }}"}      # expanded
//! a: {"->": "var {{ b }}", when: c}     # arrow inside the mapping
//! a->: var {{ b }} --when c             # compact key
//! a_>: var {{ b }}                      # compact key, private
//! a->: "{{ b }}"                        # templated first word: var
//! a->: {x: 1, y->: var x}               # mapping body: block
//! a->: [1, 2]                           # list body: block
//! ->: print hello                       # no target: result discarded
//! ```

use std::collections::HashSet;

use hookwalk_core::types::key_to_string;
use hookwalk_core::{HookCall, KeyPath, Mapping, Value};
use hookwalk_renderer::is_template;

use crate::error::EngineError;

pub const ARROW_PUBLIC: &str = "->";
pub const ARROW_PRIVATE: &str = "_>";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Data(Value),
    Call(HookCall),
}

/// One classified mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Key as it appears in key paths: the target name, or the raw key
    /// when the call has no target.
    pub key: String,
    /// Where the result goes; `None` discards it.
    pub target: Option<String>,
    /// Declared private with `_>`.
    pub private: bool,
    pub node: Node,
}

fn classify_error(at: &KeyPath, message: impl Into<String>) -> EngineError {
    EngineError::Classify {
        key_path: at.to_string(),
        message: message.into(),
    }
}

/// Split `key->` / `key_>` into the target and whether it is private.
fn split_arrow(key: &str) -> Option<(&str, bool)> {
    if let Some(target) = key.strip_suffix(ARROW_PRIVATE) {
        return Some((target, true));
    }
    key.strip_suffix(ARROW_PUBLIC).map(|target| (target, false))
}

/// Classify every entry of a mapping, in declaration order.
pub fn classify_mapping(map: &Mapping, at: &KeyPath) -> Result<Vec<Entry>, EngineError> {
    let mut entries = Vec::with_capacity(map.len());
    let mut targets = HashSet::new();
    for (raw_key, value) in map {
        let key = key_to_string(raw_key)
            .ok_or_else(|| classify_error(at, "mapping keys must be scalars"))?;
        let entry = classify_entry(&key, value, at)?;
        if let Some(target) = &entry.target {
            if !targets.insert(target.clone()) {
                return Err(classify_error(
                    &at.key(target.as_str()),
                    format!("key '{target}' is declared more than once"),
                ));
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}

pub fn classify_entry(key: &str, value: &Value, at: &KeyPath) -> Result<Entry, EngineError> {
    if let Some((target, private)) = split_arrow(key) {
        let path_key = if target.is_empty() { key } else { target };
        let call = arrow_call(value, &at.key(path_key))?;
        tracing::debug!(key, hook = %call.hook_type, "compact hook call");
        return Ok(Entry {
            key: path_key.to_owned(),
            target: (!target.is_empty()).then(|| target.to_owned()),
            private,
            node: Node::Call(call),
        });
    }
    let (node, private) = match value {
        Value::Mapping(map) => match mapping_call(map, &at.key(key))? {
            Some((call, private)) => (Node::Call(call), private),
            None => (Node::Data(value.clone()), false),
        },
        other => (Node::Data(other.clone()), false),
    };
    Ok(Entry {
        key: key.to_owned(),
        target: Some(key.to_owned()),
        private,
        node,
    })
}

/// Classify a value with no key of its own: a sequence element or an
/// `else` branch.
pub fn classify_value(value: &Value, at: &KeyPath) -> Result<Node, EngineError> {
    if let Value::Mapping(map) = value {
        if let Some((call, _)) = mapping_call(map, at)? {
            return Ok(Node::Call(call));
        }
    }
    Ok(Node::Data(value.clone()))
}

/// The body of an arrow key.
fn arrow_call(value: &Value, at: &KeyPath) -> Result<HookCall, EngineError> {
    match value {
        Value::String(s) => parse_compact(s, at),
        Value::Mapping(map) => {
            if map.contains_key("type") || map.contains_key(ARROW_PUBLIC) || map.contains_key(ARROW_PRIVATE) {
                return Err(classify_error(
                    at,
                    "an arrow key cannot hold a mapping with 'type' or another arrow",
                ));
            }
            let mut call = HookCall::new("block");
            let mut items = Mapping::new();
            for (k, v) in map {
                let is_control = k.as_str().is_some_and(|name| call.control.set(name, v.clone()));
                if !is_control {
                    items.insert(k.clone(), v.clone());
                }
            }
            call.kwargs.insert(Value::from("items"), Value::Mapping(items));
            Ok(call)
        }
        Value::Sequence(_) => {
            let mut call = HookCall::new("block");
            call.kwargs.insert(Value::from("items"), value.clone());
            Ok(call)
        }
        other => {
            let mut call = HookCall::new("var");
            call.args.push(other.clone());
            Ok(call)
        }
    }
}

/// A mapping value that is itself a call: `{type: ...}` or `{"->": ...}`.
/// Returns the call and whether it is private.
fn mapping_call(map: &Mapping, at: &KeyPath) -> Result<Option<(HookCall, bool)>, EngineError> {
    let public = map.get(ARROW_PUBLIC);
    let private = map.get(ARROW_PRIVATE);
    let typed = map.get("type");

    let (mut call, is_private, consumed) = match (public, private, typed) {
        (None, None, None) => return Ok(None),
        (Some(_), Some(_), _) => {
            return Err(classify_error(at, "both '->' and '_>' are given"));
        }
        (Some(_), None, Some(_)) | (None, Some(_), Some(_)) => {
            return Err(classify_error(at, "both 'type' and an arrow key are given"));
        }
        (Some(body), None, None) => (arrow_call(body, at)?, false, ARROW_PUBLIC),
        (None, Some(body), None) => (arrow_call(body, at)?, true, ARROW_PRIVATE),
        (None, None, Some(t)) => {
            let Value::String(name) = t else {
                return Err(classify_error(at, "hook type must be a string"));
            };
            (HookCall::new(name.as_str()), false, "type")
        }
    };

    for (k, v) in map {
        let Some(name) = k.as_str() else {
            return Err(classify_error(at, "hook field names must be strings"));
        };
        if name == consumed {
            continue;
        }
        if name == "args" {
            match v {
                Value::Sequence(items) => call.args.extend(items.iter().cloned()),
                other => call.args.push(other.clone()),
            }
            continue;
        }
        if !call.control.set(name, v.clone()) {
            call.kwargs.insert(k.clone(), v.clone());
        }
    }
    Ok(Some((call, is_private)))
}

/// Parse a compact call string such as `command "ls -l" --ignore-error`.
pub fn parse_compact(source: &str, at: &KeyPath) -> Result<HookCall, EngineError> {
    let trimmed = source.trim();
    let (masked, spans) = mask_templates(trimmed);
    let tokens: Vec<String> = shell_words::split(&masked)
        .map_err(|e| classify_error(at, format!("cannot split '{trimmed}': {e}")))?
        .iter()
        .map(|t| unmask_templates(t, &spans))
        .collect();
    let Some((first, rest)) = tokens.split_first() else {
        return Err(classify_error(at, "empty hook call"));
    };
    if is_template(first) {
        let mut call = HookCall::new("var");
        call.args.push(Value::String(trimmed.to_owned()));
        return Ok(call);
    }

    let mut call = HookCall::new(first.as_str());
    let mut rest = rest.iter().peekable();
    while let Some(token) = rest.next() {
        let Some(name) = flag_name(token) else {
            call.args.push(scalar(token));
            continue;
        };
        let name = name.replace('-', "_");
        let value = match rest.peek() {
            Some(next) if flag_name(next).is_none() => scalar(rest.next().map_or("", String::as_str)),
            _ => Value::Bool(true),
        };
        if !call.control.set(&name, value.clone()) {
            call.kwargs.insert(Value::String(name), value);
        }
    }
    Ok(call)
}

const MASK: char = '\u{1}';

/// Replace every `{{ ... }}` span with an opaque marker so splitting keeps
/// each expression whole, quotes and spaces included.
fn mask_templates(s: &str) -> (String, Vec<&str>) {
    let mut masked = String::with_capacity(s.len());
    let mut spans = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        let end = start + len + 2;
        masked.push_str(&rest[..start]);
        masked.push_str(&format!("{MASK}{}{MASK}", spans.len()));
        spans.push(&rest[start..end]);
        rest = &rest[end..];
    }
    masked.push_str(rest);
    (masked, spans)
}

fn unmask_templates(token: &str, spans: &[&str]) -> String {
    if !token.contains(MASK) {
        return token.to_owned();
    }
    spans.iter().enumerate().fold(token.to_owned(), |acc, (i, span)| {
        acc.replace(&format!("{MASK}{i}{MASK}"), span)
    })
}

fn flag_name(token: &str) -> Option<&str> {
    token.strip_prefix("--").filter(|n| !n.is_empty())
}

/// Bare words keep their YAML meaning for booleans, numbers and null;
/// everything else stays a string.
fn scalar(token: &str) -> Value {
    if token.is_empty() {
        return Value::String(String::new());
    }
    match serde_yaml::from_str::<Value>(token) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => v,
        _ => Value::String(token.to_owned()),
    }
}

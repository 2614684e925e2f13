//! Tiered context store.
//!
//! ```text
//! existing   caller-supplied context, read-only during the run
//! public     the returned result
//! private    renderable, never returned
//! frames[]   one per open block / loop iteration, innermost last
//!   temporary  loop variables, discarded on pop
//!   public     block output, handed back by pop_scope
//!   private    block-private keys, discarded on pop
//! ```
//!
//! Name resolution searches innermost frame first (temporary, private,
//! public), then the root `private`, `public`, `existing`. All values are
//! owned `serde_yaml::Value`s, so anything promoted out of a frame is a
//! deep copy and iterations never share a backing collection.

use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::{KeyPath, Mapping, Segment, Value, Visibility};

/// A named tier for direct writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Existing,
    Public,
    Private,
    Temporary,
}

impl From<Visibility> for Tier {
    fn from(v: Visibility) -> Self {
        match v {
            Visibility::Public => Tier::Public,
            Visibility::Private => Tier::Private,
        }
    }
}

/// Why a scope was opened. Loop frames only carry temporaries; writes
/// pass through them to the nearest block frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Block,
    Loop,
}

#[derive(Debug, Clone)]
struct Frame {
    kind: FrameKind,
    temporary: Mapping,
    public: Mapping,
    private: Mapping,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            temporary: Mapping::new(),
            public: Mapping::new(),
            private: Mapping::new(),
        }
    }
}

/// Result of a loose lookup: unresolved names are preserved literally.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a Value),
    Unresolved(String),
}

#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    pub existing: Mapping,
    pub public: Mapping,
    pub private: Mapping,
    frames: Vec<Frame>,
    overrides: HashMap<String, Value>,
}

impl ContextStore {
    pub fn new(existing: Mapping) -> Self {
        Self {
            existing,
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Resolve `name` across every visible tier, innermost first.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let key = Value::String(name.to_owned());
        for frame in self.frames.iter().rev() {
            for tier in [&frame.temporary, &frame.private, &frame.public] {
                if let Some(v) = tier.get(&key) {
                    return Some(v);
                }
            }
        }
        [&self.private, &self.public, &self.existing]
            .into_iter()
            .find_map(|tier| tier.get(&key))
    }

    /// Strict lookup.
    pub fn get(&self, name: &str) -> Result<&Value, CoreError> {
        self.lookup(name).ok_or_else(|| CoreError::UndefinedName {
            name: name.to_owned(),
        })
    }

    /// Loose lookup.
    pub fn get_loose(&self, name: &str) -> Lookup<'_> {
        match self.lookup(name) {
            Some(v) => Lookup::Found(v),
            None => Lookup::Unresolved(name.to_owned()),
        }
    }

    /// Read a nested value from the tier that `visibility` writes to.
    pub fn get_at(&self, visibility: Visibility, path: &KeyPath) -> Option<&Value> {
        let root = self.write_tier(visibility);
        let (first, rest) = path.segments().split_first()?;
        let Segment::Key(k) = first else { return None };
        let mut cur = root.get(Value::String(k.clone()))?;
        for seg in rest {
            cur = match (seg, cur) {
                (Segment::Key(k), Value::Mapping(m)) => m.get(Value::String(k.clone()))?,
                (Segment::Index(i), Value::Sequence(s)) => s.get(*i)?,
                _ => return None,
            };
        }
        Some(cur)
    }

    /// Flatten every visible tier into one mapping, innermost last, for the
    /// render gateway.
    pub fn snapshot(&self) -> Mapping {
        let mut out = self.existing.clone();
        for tier in [&self.public, &self.private] {
            extend(&mut out, tier);
        }
        for frame in &self.frames {
            for tier in [&frame.public, &frame.private, &frame.temporary] {
                extend(&mut out, tier);
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Direct write of a top-level key. Public and private writes land in
    /// the nearest open block frame, or the root tiers when none is open.
    pub fn set(&mut self, tier: Tier, key: &str, value: Value) -> Result<(), CoreError> {
        let key_value = Value::String(key.to_owned());
        match tier {
            Tier::Existing => {
                self.existing.insert(key_value, value);
            }
            Tier::Public => {
                self.write_tier_mut(Visibility::Public).insert(key_value, value);
            }
            Tier::Private => {
                self.write_tier_mut(Visibility::Private).insert(key_value, value);
            }
            Tier::Temporary => {
                let frame = self.frames.last_mut().ok_or_else(|| CoreError::NoScope {
                    key: key.to_owned(),
                })?;
                frame.temporary.insert(key_value, value);
            }
        }
        Ok(())
    }

    /// Write `value` at a nested `path`, creating intermediate mappings and
    /// sequences. An index equal to the sequence length appends.
    pub fn set_at(
        &mut self,
        visibility: Visibility,
        path: &KeyPath,
        value: Value,
    ) -> Result<(), CoreError> {
        let root = self.write_tier_mut(visibility);
        write_path(root, path, value)
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    pub fn push_scope(&mut self, kind: FrameKind) {
        self.frames.push(Frame::new(kind));
    }

    /// Close the innermost scope and hand back its public output.
    /// Temporaries and block-private keys are dropped.
    pub fn pop_scope(&mut self) -> Result<Mapping, CoreError> {
        let frame = self.frames.pop().ok_or(CoreError::ScopeUnderflow)?;
        Ok(frame.public)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// A fresh store over `existing` that keeps this store's overrides.
    /// Nothing else is shared.
    pub fn isolated(&self, existing: Mapping) -> Self {
        Self {
            existing,
            overrides: self.overrides.clone(),
            ..Self::default()
        }
    }

    // -----------------------------------------------------------------------
    // Overrides
    // -----------------------------------------------------------------------

    /// Replace whatever the document declares at `path` with `value`.
    pub fn set_override(&mut self, path: impl Into<String>, value: Value) {
        self.overrides.insert(path.into(), value);
    }

    pub fn override_at(&self, path: &KeyPath) -> Option<&Value> {
        if self.overrides.is_empty() {
            return None;
        }
        self.overrides.get(&path.to_string())
    }

    fn write_tier(&self, visibility: Visibility) -> &Mapping {
        let frame = self.frames.iter().rev().find(|f| f.kind == FrameKind::Block);
        match (frame, visibility) {
            (Some(f), Visibility::Public) => &f.public,
            (Some(f), Visibility::Private) => &f.private,
            (None, Visibility::Public) => &self.public,
            (None, Visibility::Private) => &self.private,
        }
    }

    fn write_tier_mut(&mut self, visibility: Visibility) -> &mut Mapping {
        let frame = self
            .frames
            .iter_mut()
            .rev()
            .find(|f| f.kind == FrameKind::Block);
        match (frame, visibility) {
            (Some(f), Visibility::Public) => &mut f.public,
            (Some(f), Visibility::Private) => &mut f.private,
            (None, Visibility::Public) => &mut self.public,
            (None, Visibility::Private) => &mut self.private,
        }
    }
}

fn extend(out: &mut Mapping, tier: &Mapping) {
    for (k, v) in tier {
        out.insert(k.clone(), v.clone());
    }
}

fn write_path(root: &mut Mapping, path: &KeyPath, value: Value) -> Result<(), CoreError> {
    let Some((first, rest)) = path.segments().split_first() else {
        return Err(CoreError::NotAContainer {
            path: path.to_string(),
            at: path.to_string(),
        });
    };
    let Segment::Key(k) = first else {
        return Err(CoreError::NotAContainer {
            path: path.to_string(),
            at: "<root>".into(),
        });
    };
    let mut slot = root.entry(Value::String(k.clone())).or_insert(Value::Null);
    for seg in rest {
        slot = step(slot, seg, path)?;
    }
    *slot = value;
    Ok(())
}

fn step<'v>(slot: &'v mut Value, seg: &Segment, path: &KeyPath) -> Result<&'v mut Value, CoreError> {
    match seg {
        Segment::Key(k) => {
            if slot.is_null() {
                *slot = Value::Mapping(Mapping::new());
            }
            match slot {
                Value::Mapping(m) => Ok(m.entry(Value::String(k.clone())).or_insert(Value::Null)),
                _ => Err(CoreError::NotAContainer {
                    path: path.to_string(),
                    at: k.clone(),
                }),
            }
        }
        Segment::Index(i) => {
            if slot.is_null() {
                *slot = Value::Sequence(Vec::new());
            }
            match slot {
                Value::Sequence(s) => {
                    let len = s.len();
                    if *i == len {
                        s.push(Value::Null);
                    }
                    s.get_mut(*i).ok_or_else(|| CoreError::IndexOutOfBounds {
                        path: path.to_string(),
                        index: *i,
                        len,
                    })
                }
                _ => Err(CoreError::NotAContainer {
                    path: path.to_string(),
                    at: i.to_string(),
                }),
            }
        }
    }
}

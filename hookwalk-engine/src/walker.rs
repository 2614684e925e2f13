//! The tree-walking interpreter.
//!
//! Each node goes through three phases:
//!
//! 1. skip-check: a false `when` skips the node and assigns `else`, if any
//! 2. expand: `loop` runs the call once per element in a fresh loop frame
//! 3. invoke or descend: calls resolve through the registry and their
//!    result is assigned (or merged); data is descended depth-first
//!
//! All writes go through the [`ContextStore`]; the source document is never
//! modified.

use std::env;
use std::path::{Path, PathBuf};

use hookwalk_core::types::{is_directive, key_to_string};
use hookwalk_core::{
    ContextStore, FrameKind, HookCall, KeyPath, Mapping, Segment, Tier, Value, Visibility,
};
use hookwalk_registry::{
    DeclarativeHook, ExecEnv, FieldKind, FieldSpec, HookDescriptor, HookImpl, HookOutcome,
    HookRegistry, HookSchema,
};
use hookwalk_renderer::{is_template, RenderError, Renderer};

use crate::classify::{classify_mapping, classify_value, Node};
use crate::error::{io_err, EngineError};

/// Where a node's result lands.
#[derive(Debug, Clone)]
struct Cursor {
    /// Path from the document root, used in errors, overrides and records.
    full: KeyPath,
    /// Container path inside the current block frame.
    parent: KeyPath,
    /// Slot inside `parent`; `None` discards the result.
    slot: Option<Segment>,
    visibility: Visibility,
}

impl Cursor {
    fn local(&self) -> Option<KeyPath> {
        self.slot.clone().map(|seg| {
            let mut path = self.parent.clone();
            path.0.push(seg);
            path
        })
    }
}

/// A mapping being walked. `visibility` is `None` at the top of a frame,
/// where each key decides its own tier.
struct Parent {
    full: KeyPath,
    local: KeyPath,
    visibility: Option<Visibility>,
}

impl Parent {
    fn frame(full: KeyPath) -> Self {
        Self {
            full,
            local: KeyPath::root(),
            visibility: None,
        }
    }
}

struct Evaluated {
    value: Value,
    merge: bool,
}

/// Restores the previous working directory on drop.
pub(crate) struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    pub(crate) fn enter(dir: &Path) -> Result<Self, EngineError> {
        let previous = env::current_dir().map_err(|e| io_err(".", e))?;
        env::set_current_dir(dir).map_err(|e| io_err(dir, e))?;
        tracing::debug!(dir = %dir.display(), "changed working directory");
        Ok(Self { previous })
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::warn!(dir = %self.previous.display(), error = %e, "could not restore working directory");
        }
    }
}

pub struct Walker<'r> {
    registry: &'r HookRegistry,
    renderer: &'r dyn Renderer,
    store: ContextStore,
    no_input: bool,
    /// Directory of the document being walked; local hooks resolve here.
    base_dir: PathBuf,
    /// Results of interactive hooks and applied overrides, by key path.
    recorded: Mapping,
}

impl<'r> Walker<'r> {
    pub fn new(
        registry: &'r HookRegistry,
        renderer: &'r dyn Renderer,
        store: ContextStore,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            renderer,
            store,
            no_input: false,
            base_dir: base_dir.into(),
            recorded: Mapping::new(),
        }
    }

    pub fn no_input(mut self, no_input: bool) -> Self {
        self.no_input = no_input;
        self
    }

    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    pub fn recorded(&self) -> &Mapping {
        &self.recorded
    }

    pub fn into_store(self) -> ContextStore {
        self.store
    }

    /// Walk a whole document. Top-level `__` directives are skipped; the
    /// caller consumes them before the walk.
    pub fn walk_document(&mut self, document: &Mapping) -> Result<(), EngineError> {
        let body: Mapping = document
            .iter()
            .filter(|(k, _)| !k.as_str().is_some_and(is_directive))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.walk_entries(&body, &Parent::frame(KeyPath::root()))
    }

    // -----------------------------------------------------------------------
    // Descent
    // -----------------------------------------------------------------------

    fn walk_entries(&mut self, map: &Mapping, parent: &Parent) -> Result<(), EngineError> {
        for entry in classify_mapping(map, &parent.full)? {
            let visibility = if entry.private {
                Visibility::Private
            } else {
                parent
                    .visibility
                    .unwrap_or_else(|| Visibility::of_key(&entry.key))
            };
            let cursor = Cursor {
                full: parent.full.key(entry.key.as_str()),
                parent: parent.local.clone(),
                slot: entry.target.map(Segment::Key),
                visibility,
            };
            self.walk_node(entry.node, &cursor)?;
        }
        Ok(())
    }

    /// Process one node. Returns whether anything was written.
    fn walk_node(&mut self, node: Node, cursor: &Cursor) -> Result<bool, EngineError> {
        let hook_type = match &node {
            Node::Call(call) => Some(call.hook_type.clone()),
            Node::Data(_) => None,
        };
        let result = match self.replaced(&node, &cursor.full) {
            Ok(Some(done)) => self.assign(cursor, done.value, done.merge),
            Ok(None) => match node {
                Node::Data(value) => self.walk_data(&value, cursor),
                Node::Call(call) => match self.evaluate(call, &cursor.full) {
                    Ok(Some(done)) => self.assign(cursor, done.value, done.merge),
                    Ok(None) => Ok(false),
                    Err(e) => Err(e),
                },
            },
            Err(e) => Err(e),
        };
        result.map_err(|e| e.at(&cursor.full, hook_type.as_deref()))
    }

    /// The override for the node at `at`, if any. A call keeps its `merge`
    /// flag; a call whose `when` is false is not replaced and is skipped
    /// as usual.
    fn replaced(&mut self, node: &Node, at: &KeyPath) -> Result<Option<Evaluated>, EngineError> {
        let Some(value) = self.store.override_at(at).cloned() else {
            return Ok(None);
        };
        let merge = match node {
            Node::Call(call) => {
                if !self.flag_or(call.control.when.as_ref(), true)? {
                    return Ok(None);
                }
                self.flag_or(call.control.merge.as_ref(), false)?
            }
            Node::Data(_) => false,
        };
        tracing::debug!(key = %at, merge, "node replaced by override");
        self.record(at, value.clone());
        Ok(Some(Evaluated { value, merge }))
    }

    fn walk_data(&mut self, value: &Value, cursor: &Cursor) -> Result<bool, EngineError> {
        let Some(local) = cursor.local() else {
            return Ok(false);
        };
        match value {
            Value::Mapping(map) => {
                self.store
                    .set_at(cursor.visibility, &local, Value::Mapping(Mapping::new()))?;
                let parent = Parent {
                    full: cursor.full.clone(),
                    local,
                    visibility: Some(cursor.visibility),
                };
                self.walk_entries(map, &parent)?;
            }
            Value::Sequence(items) => {
                self.store
                    .set_at(cursor.visibility, &local, Value::Sequence(Vec::new()))?;
                let mut next = 0;
                for (i, item) in items.iter().enumerate() {
                    let full = cursor.full.index(i);
                    let node = classify_value(item, &full)?;
                    let child = Cursor {
                        full,
                        parent: local.clone(),
                        slot: Some(Segment::Index(next)),
                        visibility: cursor.visibility,
                    };
                    if self.walk_node(node, &child)? {
                        next += 1;
                    }
                }
            }
            scalar => {
                let rendered = self.renderer.render_value(scalar, &self.store)?;
                self.store.set_at(cursor.visibility, &local, rendered)?;
            }
        }
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Skip-check and expand one call. `None` means the call was skipped
    /// with no `else`.
    fn evaluate(&mut self, call: HookCall, full: &KeyPath) -> Result<Option<Evaluated>, EngineError> {
        if let Some(when) = &call.control.when {
            if !self.renderer.condition(when, &self.store)? {
                tracing::debug!(key = %full, hook = %call.hook_type, "condition false, skipping");
                return self.otherwise(call.control.else_value.as_ref(), full);
            }
        }
        let merge = self.flag_or(call.control.merge.as_ref(), false)?;
        let attempt = self.flag_or(call.control.try_.as_ref(), false)?;
        let result = match &call.control.loop_over {
            Some(spec) => self.run_loop(&call, spec, full),
            None => self.invoke(&call, full),
        };
        match result {
            Ok(value) => Ok(Some(Evaluated { value, merge })),
            Err(e) if attempt => {
                tracing::warn!(key = %full, hook = %call.hook_type, error = %e, "call failed, using except");
                self.recover(call.control.except.as_ref(), full)
            }
            Err(e) => Err(e),
        }
    }

    /// Render an optional boolean control field.
    fn flag_or(&self, value: Option<&Value>, absent: bool) -> Result<bool, EngineError> {
        match value {
            Some(v) => Ok(self.renderer.condition(v, &self.store)?),
            None => Ok(absent),
        }
    }

    /// The `except` branch of a failed `try` call. A call is evaluated with
    /// its own controls; data is walked like a list element. Without a
    /// branch nothing is assigned.
    fn recover(&mut self, branch: Option<&Value>, full: &KeyPath) -> Result<Option<Evaluated>, EngineError> {
        let Some(branch) = branch else {
            return Ok(None);
        };
        match classify_value(branch, full)? {
            Node::Call(call) => self.evaluate(call, full),
            Node::Data(data) => Ok(Some(Evaluated {
                value: self.build_data(data, full)?,
                merge: false,
            })),
        }
    }

    /// The `else` branch of a skipped call. A call in `else` continues the
    /// chain with its own `when` / `else`.
    fn otherwise(&mut self, branch: Option<&Value>, full: &KeyPath) -> Result<Option<Evaluated>, EngineError> {
        let Some(branch) = branch else {
            return Ok(None);
        };
        let value = match branch {
            Value::Mapping(_) => match classify_value(branch, full)? {
                Node::Call(call) => return self.evaluate(call, full),
                Node::Data(data) => self.renderer.render_value(&data, &self.store)?,
            },
            Value::String(_) | Value::Sequence(_) => self.renderer.render_value(branch, &self.store)?,
            other => other.clone(),
        };
        Ok(Some(Evaluated { value, merge: false }))
    }

    fn run_loop(&mut self, call: &HookCall, spec: &Value, full: &KeyPath) -> Result<Value, EngineError> {
        let (names, collection) = self.loop_collection(spec, full)?;
        let mut iterations: Vec<(Value, Option<Value>)> = match collection {
            Value::Sequence(items) => items.into_iter().map(|item| (item, None)).collect(),
            Value::Mapping(map) => map.into_iter().map(|(k, v)| (k, Some(v))).collect(),
            Value::Null => Vec::new(),
            other => {
                return Err(EngineError::Input {
                    key_path: full.to_string(),
                    message: format!("loop must be a list or a mapping, got {}", display(&other)),
                })
            }
        };
        if let Some(flag) = &call.control.reverse {
            if self.renderer.condition(flag, &self.store)? {
                iterations.reverse();
            }
        }

        let mut body = call.clone();
        body.control.loop_over = None;
        body.control.filter = None;
        body.control.reverse = None;

        tracing::debug!(key = %full, hook = %call.hook_type, count = iterations.len(), "looping");
        let mut results = Vec::with_capacity(iterations.len());
        for (index, (first, second)) in iterations.into_iter().enumerate() {
            let at = full.index(index);
            self.store.push_scope(FrameKind::Loop);
            let result = self.iteration(&body, call.control.filter.as_ref(), &names, index, first, second, &at);
            self.store.pop_scope()?;
            if let Some(value) = result.map_err(|e| e.at(&at, Some(call.hook_type.as_str())))? {
                results.push(value);
            }
        }
        Ok(Value::Sequence(results))
    }

    #[allow(clippy::too_many_arguments)]
    fn iteration(
        &mut self,
        body: &HookCall,
        filter: Option<&Value>,
        names: &[String],
        index: usize,
        first: Value,
        second: Option<Value>,
        at: &KeyPath,
    ) -> Result<Option<Value>, EngineError> {
        let index_value = Value::from(index as u64);
        let mut bindings: Vec<(&str, Value)> = match (names, second) {
            ([], None) => vec![("item", first)],
            ([], Some(value)) => vec![("key", first), ("value", value)],
            ([name], _) => vec![(name.as_str(), first)],
            ([i, x], None) => vec![(i.as_str(), index_value.clone()), (x.as_str(), first)],
            ([k, v], Some(value)) => vec![(k.as_str(), first), (v.as_str(), value)],
            _ => {
                return Err(EngineError::Input {
                    key_path: at.to_string(),
                    message: "a loop binds at most two names".into(),
                })
            }
        };
        if !bindings.iter().any(|(n, _)| *n == "index") {
            bindings.push(("index", index_value));
        }
        for (name, value) in bindings {
            self.store.set(Tier::Temporary, name, value)?;
        }

        if let Some(filter) = filter {
            if !self.renderer.condition(filter, &self.store)? {
                return Ok(None);
            }
        }
        if let Some(value) = self.store.override_at(at).cloned() {
            self.record(at, value.clone());
            return Ok(Some(value));
        }
        self.invoke(body, at).map(Some)
    }

    /// Resolve a `loop` value into loop variable names and a collection.
    fn loop_collection(&self, spec: &Value, full: &KeyPath) -> Result<(Vec<String>, Value), EngineError> {
        match spec {
            Value::String(s) => match split_binding(s) {
                Some((names, expr)) => Ok((names, self.expression(expr)?)),
                None => Ok((Vec::new(), self.expression(s)?)),
            },
            Value::Sequence(_) | Value::Mapping(_) => {
                Ok((Vec::new(), self.renderer.render_value(spec, &self.store)?))
            }
            other => Err(EngineError::Input {
                key_path: full.to_string(),
                message: format!("cannot loop over {}", display(other)),
            }),
        }
    }

    fn expression(&self, s: &str) -> Result<Value, RenderError> {
        if is_template(s) {
            self.renderer.render_str(s, &self.store)
        } else {
            self.renderer.evaluate(s.trim(), &self.store)
        }
    }

    /// Resolve, prepare and run a single call.
    fn invoke(&mut self, call: &HookCall, full: &KeyPath) -> Result<Value, EngineError> {
        let registry = self.registry;
        let descriptor = registry.resolve(&call.hook_type, Some(self.base_dir.as_path()))?;
        tracing::debug!(key = %full, hook = %descriptor.type_name, source = %descriptor.source, "invoking");
        let fields = self.prepare_fields(descriptor, call, full)?;

        let _cwd = match &call.control.chdir {
            Some(dir) => {
                let dir = self.renderer.render_value(dir, &self.store)?;
                let dir = key_to_string(&dir).ok_or_else(|| EngineError::Input {
                    key_path: full.to_string(),
                    message: "chdir must be a path".into(),
                })?;
                Some(CwdGuard::enter(Path::new(&dir))?)
            }
            None => None,
        };

        let value = match &descriptor.implementation {
            HookImpl::Block => {
                let items = fields.get("items").cloned().unwrap_or(Value::Null);
                self.run_block(items, full)?
            }
            HookImpl::Declarative(hook) => self.run_declarative(hook, fields, full)?,
            HookImpl::Native(ctor) => {
                let hook = ctor(&fields)?;
                let outcome = {
                    let mut env = ExecEnv {
                        context: &self.store,
                        renderer: self.renderer,
                        key_path: full,
                        no_input: self.no_input,
                    };
                    hook.exec(&mut env)?
                };
                match outcome {
                    HookOutcome::Success(value) => value,
                    HookOutcome::Failure { output, cause } => {
                        let ignore = match &call.control.ignore_error {
                            Some(flag) => self.renderer.condition(flag, &self.store)?,
                            None => false,
                        };
                        if !ignore {
                            return Err(EngineError::Failed {
                                hook_type: descriptor.type_name.clone(),
                                cause,
                            });
                        }
                        tracing::warn!(key = %full, hook = %descriptor.type_name, %cause, "ignoring hook failure");
                        output
                    }
                }
            }
        };

        if descriptor.schema.interactive {
            self.record(full, value.clone());
        }
        Ok(value)
    }

    fn run_block(&mut self, items: Value, full: &KeyPath) -> Result<Value, EngineError> {
        self.store.push_scope(FrameKind::Block);
        let result = match &items {
            Value::Mapping(map) => self.walk_entries(map, &Parent::frame(full.clone())).map(|()| None),
            Value::Sequence(list) => self.build_list(list, full).map(Some),
            other => Err(EngineError::Input {
                key_path: full.to_string(),
                message: format!("block items must be a mapping or a list, got {}", display(other)),
            }),
        };
        let public = self.store.pop_scope()?;
        Ok(match result? {
            Some(list) => Value::Sequence(list),
            None => Value::Mapping(public),
        })
    }

    /// Evaluate the elements of a list body in order, skipping calls whose
    /// `when` is false.
    fn build_list(&mut self, items: &[Value], full: &KeyPath) -> Result<Vec<Value>, EngineError> {
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let at = full.index(i);
            if let Some(value) = self.build(item, &at)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    fn build(&mut self, item: &Value, at: &KeyPath) -> Result<Option<Value>, EngineError> {
        let node = classify_value(item, at)?;
        let hook_type = match &node {
            Node::Call(call) => Some(call.hook_type.clone()),
            Node::Data(_) => None,
        };
        let done = match self.replaced(&node, at) {
            Ok(Some(done)) => Some(done),
            Ok(None) => match node {
                Node::Call(call) => self.evaluate(call, at).map_err(|e| e.at(at, hook_type.as_deref()))?,
                Node::Data(data) => return self.build_data(data, at).map(Some),
            },
            Err(e) => return Err(e.at(at, hook_type.as_deref())),
        };
        match done {
            Some(d) if d.merge => Err(EngineError::Merge {
                key_path: at.to_string(),
                message: "cannot merge into a list".into(),
            }),
            Some(d) => Ok(Some(d.value)),
            None => Ok(None),
        }
    }

    /// Build a data element: mappings are walked in their own block frame,
    /// lists element by element, scalars rendered.
    fn build_data(&mut self, data: Value, at: &KeyPath) -> Result<Value, EngineError> {
        match data {
            Value::Mapping(map) => {
                self.store.push_scope(FrameKind::Block);
                let result = self.walk_entries(&map, &Parent::frame(at.clone()));
                let public = self.store.pop_scope()?;
                result?;
                Ok(Value::Mapping(public))
            }
            Value::Sequence(list) => Ok(Value::Sequence(self.build_list(&list, at)?)),
            other => self
                .renderer
                .render_value(&other, &self.store)
                .map_err(|e| EngineError::from(e).at(at, None)),
        }
    }

    /// Walk a declarative hook's body against its own store whose
    /// `existing` tier is the hook's fields.
    fn run_declarative(&mut self, hook: &DeclarativeHook, fields: Mapping, full: &KeyPath) -> Result<Value, EngineError> {
        let inner = self.store.isolated(fields);
        let outer_store = std::mem::replace(&mut self.store, inner);
        let outer_dir = std::mem::replace(&mut self.base_dir, hook.base_dir.clone());
        let result = self.walk_entries(&hook.exec, &Parent::frame(full.clone()));
        let inner = std::mem::replace(&mut self.store, outer_store);
        self.base_dir = outer_dir;
        result?;
        Ok(match &hook.return_key {
            Some(key) => inner.public.get(key.as_str()).cloned().unwrap_or(Value::Null),
            None => Value::Mapping(inner.public),
        })
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    /// Turn a call's args and kwargs into the validated field mapping a
    /// hook is built from.
    fn prepare_fields(
        &self,
        descriptor: &HookDescriptor,
        call: &HookCall,
        full: &KeyPath,
    ) -> Result<Mapping, EngineError> {
        let schema = &descriptor.schema;
        let input_err = |message: String| EngineError::Input {
            key_path: full.to_string(),
            message,
        };

        let mut raw = call.kwargs.clone();
        if let Some(extra) = &call.control.kwargs {
            match self.renderer.render_value(extra, &self.store)? {
                Value::Mapping(map) => {
                    for (k, v) in map {
                        if !raw.contains_key(&k) {
                            raw.insert(k, v);
                        }
                    }
                }
                Value::Null => {}
                other => return Err(input_err(format!("kwargs must be a mapping, got {}", display(&other)))),
            }
        }
        bind_positional(schema, &call.args, &mut raw).map_err(&input_err)?;

        if !schema.extra_fields {
            for key in raw.keys() {
                let name = key_to_string(key).unwrap_or_default();
                if schema.get(&name).is_none() {
                    return Err(input_err(format!(
                        "unknown field '{name}' for hook '{}'",
                        descriptor.type_name
                    )));
                }
            }
        }

        let mut fields = Mapping::new();
        for spec in &schema.fields {
            let key = Value::String(spec.name.clone());
            let value = match (raw.remove(&key), &spec.default) {
                (Some(given), default) => match (self.render_field(spec, &given), default) {
                    (Ok(v), _) => v,
                    (Err(e), Some(default)) if e.is_undefined() => {
                        tracing::debug!(key = %full, field = %spec.name, "undefined variable, using default");
                        self.render_default(spec, default)?
                    }
                    (Err(e), _) => return Err(e.into()),
                },
                (None, Some(default)) => self.render_default(spec, default)?,
                (None, None) if spec.required => {
                    return Err(input_err(format!("missing required field '{}'", spec.name)));
                }
                (None, None) => continue,
            };
            let value = spec
                .kind
                .coerce(value)
                .map_err(|m| input_err(format!("field '{}': {m}", spec.name)))?;
            fields.insert(key, value);
        }
        for (k, v) in raw {
            fields.insert(k, self.renderer.render_value(&v, &self.store)?);
        }
        Ok(fields)
    }

    fn render_field(&self, spec: &FieldSpec, raw: &Value) -> Result<Value, RenderError> {
        if !spec.render {
            return Ok(raw.clone());
        }
        match raw {
            Value::String(s) if spec.render_by_default && !(s.contains("{{") && s.contains("}}")) => {
                self.renderer.render_str(&format!("{{{{ {s} }}}}"), &self.store)
            }
            other => self.renderer.render_value(other, &self.store),
        }
    }

    fn render_default(&self, spec: &FieldSpec, default: &Value) -> Result<Value, RenderError> {
        if !spec.render {
            return Ok(default.clone());
        }
        self.renderer.render_value(default, &self.store)
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    fn assign(&mut self, cursor: &Cursor, value: Value, merge: bool) -> Result<bool, EngineError> {
        if merge {
            self.merge_into(cursor, value)?;
            return Ok(true);
        }
        match cursor.local() {
            Some(path) => {
                self.store.set_at(cursor.visibility, &path, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flatten a mapping result (or a looped list of mappings) into the
    /// mapping that holds the call.
    fn merge_into(&mut self, cursor: &Cursor, value: Value) -> Result<(), EngineError> {
        let merge_err = |message: &str| EngineError::Merge {
            key_path: cursor.full.to_string(),
            message: message.to_owned(),
        };
        if matches!(cursor.slot, Some(Segment::Index(_))) {
            return Err(merge_err("cannot merge into a list"));
        }
        let maps = match value {
            Value::Mapping(map) => vec![map],
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Mapping(map) => Ok(map),
                    _ => Err(merge_err("every looped result must be a mapping")),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(merge_err("only a mapping result can be merged")),
        };
        for map in maps {
            for (k, v) in map {
                let key = key_to_string(&k).ok_or_else(|| merge_err("merged keys must be scalars"))?;
                self.store.set_at(cursor.visibility, &cursor.parent.key(key), v)?;
            }
        }
        Ok(())
    }

    fn record(&mut self, at: &KeyPath, value: Value) {
        self.recorded.insert(Value::String(at.to_string()), value);
    }
}

/// Map positional args onto the schema's `args` order. Surplus args are
/// joined with spaces into the last one when it takes a string.
fn bind_positional(schema: &HookSchema, args: &[Value], fields: &mut Mapping) -> Result<(), String> {
    if args.is_empty() {
        return Ok(());
    }
    if schema.args.is_empty() {
        return Err(format!("takes no positional arguments, got {}", args.len()));
    }
    let last = schema.args.len() - 1;
    for (i, name) in schema.args.iter().enumerate() {
        let value = if i == last && args.len() > schema.args.len() {
            let kind = schema.get(name).map(|f| f.kind).unwrap_or_default();
            if !matches!(kind, FieldKind::Str | FieldKind::Any) {
                return Err(format!(
                    "too many positional arguments ({} given, {} accepted)",
                    args.len(),
                    schema.args.len()
                ));
            }
            let joined: Vec<String> = args[i..].iter().map(display).collect();
            Value::String(joined.join(" "))
        } else if let Some(v) = args.get(i) {
            v.clone()
        } else {
            break;
        };
        let key = Value::String(name.clone());
        if fields.contains_key(&key) {
            return Err(format!("field '{name}' is given both positionally and by name"));
        }
        fields.insert(key, value);
    }
    Ok(())
}

/// `"x in expr"` / `"i, x in expr"` → (names, expr).
fn split_binding(s: &str) -> Option<(Vec<String>, &str)> {
    let (lhs, rhs) = s.split_once(" in ")?;
    let names: Vec<String> = lhs.split(',').map(|n| n.trim().to_owned()).collect();
    let valid = |n: &String| {
        !n.is_empty()
            && n.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !n.starts_with(|c: char| c.is_ascii_digit())
    };
    if names.is_empty() || names.len() > 2 || !names.iter().all(valid) {
        return None;
    }
    Some((names, rhs.trim()))
}

fn display(v: &Value) -> String {
    key_to_string(v).unwrap_or_else(|| {
        serde_yaml::to_string(v)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookwalk_hooks::register_builtins;
    use hookwalk_renderer::TeraRenderer;
    use rstest::rstest;

    fn mapping(s: &str) -> Mapping {
        serde_yaml::from_str(s).unwrap()
    }

    fn walk(doc: &str) -> Result<Mapping, EngineError> {
        let mut registry = HookRegistry::new();
        register_builtins(&mut registry).unwrap();
        let renderer = TeraRenderer::new();
        let mut walker = Walker::new(&registry, &renderer, ContextStore::default(), "/nonexistent")
            .no_input(true);
        walker.walk_document(&mapping(doc))?;
        Ok(walker.into_store().public)
    }

    #[rstest]
    #[case("x in items", Some((vec!["x"], "items")))]
    #[case("i, x in {{ items }}", Some((vec!["i", "x"], "{{ items }}")))]
    #[case("{{ items }}", None)]
    #[case("a b in items", None)]
    fn loop_bindings(#[case] input: &str, #[case] expected: Option<(Vec<&str>, &str)>) {
        let got = split_binding(input);
        let expected = expected.map(|(n, e)| (n.into_iter().map(String::from).collect::<Vec<_>>(), e));
        assert_eq!(got, expected);
    }

    #[test]
    fn surplus_args_join_into_last_string_field() {
        let schema = HookSchema::new()
            .field(FieldSpec::new("input", FieldKind::Any))
            .args(["input"]);
        let mut fields = Mapping::new();
        let args = vec![Value::from("{{"), Value::from("x"), Value::from("}}")];
        bind_positional(&schema, &args, &mut fields).unwrap();
        assert_eq!(fields.get("input"), Some(&Value::from("{{ x }}")));
    }

    #[test]
    fn surplus_args_rejected_for_typed_fields() {
        let schema = HookSchema::new()
            .field(FieldSpec::new("n", FieldKind::Int))
            .args(["n"]);
        let mut fields = Mapping::new();
        let err = bind_positional(&schema, &[Value::from(1), Value::from(2)], &mut fields).unwrap_err();
        assert!(err.contains("too many"));
    }

    #[test]
    fn data_is_rendered_in_place() {
        let out = walk("{a: 1, b: '{{ a + 1 }}', c: {d: [x, '{{ b }}']}}").unwrap();
        assert_eq!(out, mapping("{a: 1, b: 2, c: {d: [x, 2]}}"));
    }

    #[test]
    fn calls_inside_data_sequences() {
        let out = walk("{a: [1, {'->': literal 2}, {'->': literal 3, when: false}, 4]}").unwrap();
        assert_eq!(out, mapping("{a: [1, 2, 4]}"));
    }

    #[test]
    fn unknown_field_is_an_input_error() {
        let err = walk("{a: {type: literal, input: 1, bogus: 2}}").unwrap_err();
        assert_eq!(err.key_path(), Some("a"));
        assert!(matches!(err.root_cause(), EngineError::Input { .. }), "got: {err}");
    }

    #[test]
    fn undefined_variable_falls_back_to_field_default() {
        let out = walk("{a: {type: input, default: '{{ missing }}'}, b: {type: confirm, default: '{{ nope }}'}}");
        // `input.default` has no declared default, so the render error stands
        assert!(out.unwrap_err().is_undefined_variable());
        let out = walk("{b: {type: confirm, default: '{{ nope }}'}}").unwrap();
        assert_eq!(out, mapping("{b: false}"));
    }

    #[test]
    fn failed_directory_restore_is_not_fatal() {
        let before = env::current_dir().unwrap();
        drop(CwdGuard {
            previous: PathBuf::from("/nonexistent/hookwalk-restore"),
        });
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn merge_into_list_is_rejected() {
        let err = walk("{a: [{'->': literal, input: {x: 1}, merge: true}]}").unwrap_err();
        assert!(matches!(err.root_cause(), EngineError::Merge { .. }), "got: {err}");
    }
}

//! Hooks declared in YAML.
//!
//! A hook file maps type names to definitions:
//!
//! ```yaml
//! greet:
//!   help: Print a greeting
//!   args: [name]
//!   fields:
//!     name: {type: str, default: world}
//!     loud: bool
//!   exec:
//!     message: "hello {{ name }}"
//!   return: message
//! ```
//!
//! Files are read from `hooks/` and `.hooks/` under a document or provider
//! directory, in file-name order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use hookwalk_core::types::key_to_string;
use hookwalk_core::{Mapping, Value};

use crate::error::{io_err, RegistryError};
use crate::hook::{FieldKind, FieldSpec, HookDescriptor, HookImpl, HookSchema, HookSource};

pub const HOOK_DIRS: &[&str] = &["hooks", ".hooks"];

/// Body of a declarative hook, walked by the interpreter with the
/// validated fields as its `existing` context.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclarativeHook {
    pub exec: Mapping,
    /// Key of the sub-walk's public output to return; the whole output
    /// when absent.
    pub return_key: Option<String>,
    /// Directory the definition came from; local hooks resolve from here.
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HookDefinition {
    #[serde(default)]
    help: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    fields: Mapping,
    #[serde(default)]
    exec: Mapping,
    #[serde(default, rename = "return")]
    return_key: Option<String>,
    #[serde(default)]
    interactive: bool,
    #[serde(default)]
    extra_fields: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldDef {
    Short(FieldKind),
    Long(LongField),
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LongField {
    #[serde(rename = "type")]
    kind: FieldKind,
    default: Option<Value>,
    required: bool,
    render_by_default: bool,
    render: bool,
    help: Option<String>,
}

impl Default for LongField {
    fn default() -> Self {
        Self {
            kind: FieldKind::Any,
            default: None,
            required: false,
            render_by_default: false,
            render: true,
            help: None,
        }
    }
}

fn invalid(path: &Path, message: impl Into<String>) -> RegistryError {
    RegistryError::InvalidDefinition {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn field_spec(name: String, def: FieldDef) -> FieldSpec {
    match def {
        FieldDef::Short(kind) => FieldSpec::new(name, kind),
        FieldDef::Long(long) => FieldSpec {
            name,
            kind: long.kind,
            default: long.default,
            required: long.required,
            render_by_default: long.render_by_default,
            render: long.render,
            help: long.help,
        },
    }
}

fn descriptor(
    path: &Path,
    type_name: String,
    def: HookDefinition,
    source: &HookSource,
) -> Result<HookDescriptor, RegistryError> {
    let mut schema = HookSchema {
        help: def.help,
        args: def.args,
        extra_fields: def.extra_fields,
        interactive: def.interactive,
        fields: Vec::new(),
    };
    for (k, v) in def.fields {
        let name = key_to_string(&k)
            .ok_or_else(|| invalid(path, format!("{type_name}: field names must be strings")))?;
        let parsed: FieldDef = serde_yaml::from_value(v).map_err(|e| {
            invalid(path, format!("{type_name}.fields.{name}: {e}"))
        })?;
        schema.fields.push(field_spec(name, parsed));
    }
    for arg in &schema.args {
        if schema.get(arg).is_none() {
            return Err(invalid(
                path,
                format!("{type_name}: positional arg '{arg}' is not a declared field"),
            ));
        }
    }
    let base_dir = path
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let implementation = HookImpl::Declarative(Arc::new(DeclarativeHook {
        exec: def.exec,
        return_key: def.return_key,
        base_dir,
    }));
    Ok(HookDescriptor::new(type_name, source.clone(), schema, implementation))
}

/// Parse every hook defined in one file.
pub fn load_hook_file(path: &Path, source: &HookSource) -> Result<Vec<HookDescriptor>, RegistryError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(vec![]);
    }
    let doc: Mapping = serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut out = Vec::with_capacity(doc.len());
    for (k, v) in doc {
        let type_name =
            key_to_string(&k).ok_or_else(|| invalid(path, "hook type names must be strings"))?;
        let def: HookDefinition = serde_yaml::from_value(v)
            .map_err(|e| invalid(path, format!("{type_name}: {e}")))?;
        out.push(descriptor(path, type_name, def, source)?);
    }
    Ok(out)
}

/// Collect hook files under `<dir>/hooks` and `<dir>/.hooks`.
pub fn hook_files(dir: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let mut files = Vec::new();
    for sub in HOOK_DIRS {
        let hooks_dir = dir.join(sub);
        if !hooks_dir.is_dir() {
            continue;
        }
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&hooks_dir)
            .map_err(|e| io_err(&hooks_dir, e))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && matches!(
                        p.extension().and_then(|s| s.to_str()),
                        Some("yaml") | Some("yml")
                    )
            })
            .collect();
        entries.sort();
        files.extend(entries);
    }
    Ok(files)
}

/// Load every declarative hook under `dir`.
pub fn load_hooks_dir(dir: &Path, source: &HookSource) -> Result<Vec<HookDescriptor>, RegistryError> {
    let mut out = Vec::new();
    for file in hook_files(dir)? {
        out.extend(load_hook_file(&file, source)?);
    }
    tracing::debug!(dir = %dir.display(), count = out.len(), "loaded declarative hooks");
    Ok(out)
}

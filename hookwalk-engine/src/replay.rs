//! Record / replay files.
//!
//! A record file is a flat YAML mapping from readable key path to the value
//! produced there:
//!
//! ```yaml
//! name: alice
//! targets.0: prod
//! ```
//!
//! Replaying registers every entry as an override, so the node at that path
//! is not executed (or prompted for) again. Single-segment keys also seed
//! the `existing` tier.

use std::path::{Path, PathBuf};

use hookwalk_core::types::key_to_string;
use hookwalk_core::{ContextStore, Mapping, Value};

use crate::error::{io_err, EngineError};

/// Load a record file. A missing or empty file is an empty record.
pub fn load(path: &Path) -> Result<Mapping, EngineError> {
    if !path.exists() {
        return Ok(Mapping::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(Value::Mapping(map)) => Ok(map),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(EngineError::Source {
            message: format!("{}: a record file must be a mapping of key path to value", path.display()),
        }),
        Err(source) => Err(EngineError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write a record file atomically (`.tmp` + rename).
pub fn save(path: &Path, inputs: &Mapping) -> Result<(), EngineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let yaml = serde_yaml::to_string(inputs).map_err(|source| EngineError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    tracing::info!(path = %path.display(), entries = inputs.len(), "wrote record file");
    Ok(())
}

/// Register each entry as an override; top-level entries also seed
/// `existing` so later templates can reference them before they run.
pub fn apply(store: &mut ContextStore, inputs: &Mapping) -> Result<(), EngineError> {
    for (k, v) in inputs {
        let path = key_to_string(k).ok_or_else(|| EngineError::Source {
            message: "record keys must be key paths".into(),
        })?;
        if !path.contains('.') {
            store.existing.insert(Value::String(path.clone()), v.clone());
        }
        store.set_override(path, v.clone());
    }
    Ok(())
}

/// `<replay_dir>/<name>.yaml`
pub fn default_record_path(replay_dir: &Path, document: &Path) -> PathBuf {
    replay_dir.join(format!("{}.yaml", document_name(document)))
}

/// `<document dir>/.<stem>.rerun.yaml`
pub fn default_rerun_path(document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().trim_start_matches('.').to_owned())
        .unwrap_or_else(|| "hookwalk".into());
    let dir = document.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!(".{stem}.rerun.yaml"))
}

/// The file stem, or the directory name for a default-named document.
fn document_name(document: &Path) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().trim_start_matches('.').to_owned())
        .unwrap_or_default();
    if stem == "hookwalk" || stem.is_empty() {
        if let Some(dir) = document.parent().and_then(Path::file_name) {
            return dir.to_string_lossy().into_owned();
        }
    }
    stem
}

//! Locating and loading documents.

use std::path::{Path, PathBuf};

use hookwalk_core::{Mapping, Settings, Value};
use hookwalk_registry::{ProviderCache, ProviderFetcher, ProviderLocation, ProviderRef};

use crate::error::{io_err, EngineError};

/// File names tried, in order, when the source is a directory.
pub const DEFAULT_NAMES: &[&str] = &[
    "hookwalk.yaml",
    ".hookwalk.yaml",
    "hookwalk.yml",
    ".hookwalk.yml",
    "hookwalk.json",
];

/// Find the default document inside `dir`.
pub fn find_in_dir(dir: &Path) -> Result<PathBuf, EngineError> {
    DEFAULT_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| EngineError::Source {
            message: format!(
                "no document in {} (looked for {})",
                dir.display(),
                DEFAULT_NAMES.join(", ")
            ),
        })
}

/// Resolve a source locator to an absolute document path.
///
/// `None` means the current directory. A locator that is not an existing
/// path is parsed as a provider reference; remote ones are fetched into the
/// provider cache.
pub fn locate(
    source: Option<&str>,
    settings: &Settings,
    cache: &ProviderCache,
    fetcher: &dyn ProviderFetcher,
    latest: bool,
) -> Result<PathBuf, EngineError> {
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    let located = match source {
        None => find_in_dir(&cwd)?,
        Some(s) if Path::new(s).is_file() => PathBuf::from(s),
        Some(s) if Path::new(s).is_dir() => find_in_dir(Path::new(s))?,
        Some(s) => {
            let reference = ProviderRef::parse(&Value::from(s), settings, &cwd)?;
            match &reference.location {
                ProviderLocation::Remote(url) => {
                    let dir = cache.ensure(url, reference.version.as_deref(), latest, fetcher)?;
                    find_in_dir(&dir)?
                }
                ProviderLocation::Local(path) => {
                    return Err(EngineError::Source {
                        message: format!("source not found: {}", path.display()),
                    })
                }
            }
        }
    };
    let absolute = std::fs::canonicalize(&located).map_err(|e| io_err(&located, e))?;
    tracing::debug!(document = %absolute.display(), "located document");
    Ok(absolute)
}

/// Parse a YAML or JSON document (or context file). The top level must be
/// a mapping; an empty file is an empty document.
pub fn load_document(path: &Path) -> Result<Mapping, EngineError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Mapping::new());
    }
    let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let value: Value = if is_json {
        serde_json::from_str(&contents).map_err(|source| EngineError::ParseJson {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_yaml::from_str(&contents).map_err(|source| EngineError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => Err(EngineError::Source {
            message: format!("{}: the document must be a mapping", path.display()),
        }),
    }
}

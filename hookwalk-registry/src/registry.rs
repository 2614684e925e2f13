//! Hook type resolution.
//!
//! Three scopes, searched nearest first:
//!
//! | Scope          | Populated by                                   |
//! |----------------|------------------------------------------------|
//! | `Local(dir)`   | `hooks/` and `.hooks/` next to a document       |
//! | `Global`       | imported providers                             |
//! | `Builtin`      | the stock hook library                         |
//!
//! A name may appear once per scope; a nearer scope shadows a farther one.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::ProviderCache;
use crate::declarative::load_hooks_dir;
use crate::error::{io_err, RegistryError};
use crate::fetch::ProviderFetcher;
use crate::hook::{HookDescriptor, HookSource};
use crate::provider::{ProviderLocation, ProviderRef};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Local(PathBuf),
    Global,
    Builtin,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Local(dir) => write!(f, "local ({})", dir.display()),
            Scope::Global => f.write_str("global"),
            Scope::Builtin => f.write_str("builtin"),
        }
    }
}

/// Optional `provider.yaml` at a provider root.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProviderManifest {
    name: Option<String>,
    version: Option<String>,
}

#[derive(Debug, Default)]
pub struct HookRegistry {
    local: HashMap<PathBuf, BTreeMap<String, HookDescriptor>>,
    global: BTreeMap<String, HookDescriptor>,
    builtin: BTreeMap<String, HookDescriptor>,
    /// Provider identity → root directory, for providers imported this run.
    imported: HashMap<String, PathBuf>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_mut(&mut self, scope: &Scope) -> &mut BTreeMap<String, HookDescriptor> {
        match scope {
            Scope::Local(dir) => self.local.entry(dir.clone()).or_default(),
            Scope::Global => &mut self.global,
            Scope::Builtin => &mut self.builtin,
        }
    }

    pub fn register(&mut self, descriptor: HookDescriptor, scope: Scope) -> Result<(), RegistryError> {
        let table = self.table_mut(&scope);
        if table.contains_key(&descriptor.type_name) {
            return Err(RegistryError::DuplicateHook {
                name: descriptor.type_name,
                scope: scope.to_string(),
            });
        }
        tracing::debug!(hook = %descriptor.type_name, %scope, "registered hook");
        table.insert(descriptor.type_name.clone(), descriptor);
        Ok(())
    }

    /// Resolve `type_name` for a document in `dir`: local, then global,
    /// then built-in.
    pub fn resolve(&self, type_name: &str, dir: Option<&Path>) -> Result<&HookDescriptor, RegistryError> {
        let local = dir.and_then(|d| self.local.get(d));
        local
            .and_then(|t| t.get(type_name))
            .or_else(|| self.global.get(type_name))
            .or_else(|| self.builtin.get(type_name))
            .ok_or_else(|| RegistryError::UnknownHookType {
                name: type_name.to_owned(),
                available: self.available(dir).into_iter().map(|(n, _)| n).collect(),
            })
    }

    /// Every resolvable type for `dir`, sorted, with the descriptor that wins.
    pub fn available(&self, dir: Option<&Path>) -> Vec<(String, &HookDescriptor)> {
        let mut merged: BTreeMap<&str, &HookDescriptor> = BTreeMap::new();
        let local = dir.and_then(|d| self.local.get(d));
        for table in [Some(&self.builtin), Some(&self.global), local].into_iter().flatten() {
            for (name, d) in table {
                merged.insert(name.as_str(), d);
            }
        }
        merged.into_iter().map(|(n, d)| (n.to_owned(), d)).collect()
    }

    /// Register the hook files next to a document. Loading the same
    /// directory twice is a no-op.
    pub fn register_local_dir(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        if self.local.contains_key(dir) {
            return Ok(0);
        }
        let scope = Scope::Local(dir.to_path_buf());
        self.local.insert(dir.to_path_buf(), BTreeMap::new());
        let descriptors = load_hooks_dir(dir, &HookSource::Local(dir.to_path_buf()))?;
        let count = descriptors.len();
        for d in descriptors {
            self.register(d, scope.clone())?;
        }
        Ok(count)
    }

    /// Make a provider's hooks resolvable in the global scope. Returns the
    /// provider's root directory. Re-importing within a run is a no-op.
    pub fn import_provider(
        &mut self,
        reference: &ProviderRef,
        cache: &ProviderCache,
        fetcher: &dyn ProviderFetcher,
    ) -> Result<PathBuf, RegistryError> {
        let identity = reference.identity();
        if let Some(root) = self.imported.get(&identity) {
            tracing::debug!(provider = %identity, "provider already imported");
            return Ok(root.clone());
        }

        let root = match &reference.location {
            ProviderLocation::Local(path) => {
                if !path.is_dir() {
                    return Err(RegistryError::InvalidProviderRef {
                        reference: identity,
                        message: "not a directory".into(),
                    });
                }
                path.clone()
            }
            ProviderLocation::Remote(url) => {
                cache.ensure(url, reference.version.as_deref(), reference.latest, fetcher)?
            }
        };

        let manifest = read_manifest(&root)?;
        let source = HookSource::Provider {
            name: manifest.name.unwrap_or_else(|| reference.name()),
            revision: reference.version.clone().or(manifest.version),
        };
        let descriptors = load_hooks_dir(&root, &source)?;
        tracing::info!(provider = %identity, hooks = descriptors.len(), "imported provider");
        for d in descriptors {
            self.register(d, Scope::Global)?;
        }
        self.imported.insert(identity, root.clone());
        Ok(root)
    }
}

fn read_manifest(root: &Path) -> Result<ProviderManifest, RegistryError> {
    let path = root.join("provider.yaml");
    if !path.exists() {
        return Ok(ProviderManifest::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(ProviderManifest::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| RegistryError::Parse { path, source: e })
}

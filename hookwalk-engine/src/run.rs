//! One complete run: locate the document, build the registry, seed the
//! context, walk, and handle record / replay / rerun.

use std::path::{Path, PathBuf};

use hookwalk_core::types::key_to_string;
use hookwalk_core::{ContextStore, Mapping, Settings, Value};
use hookwalk_hooks::register_builtins;
use hookwalk_registry::{GitFetcher, HookRegistry, ProviderCache, ProviderFetcher, ProviderRef};
use hookwalk_renderer::TeraRenderer;

use crate::error::{io_err, EngineError};
use crate::replay;
use crate::source;
use crate::walker::{CwdGuard, Walker};

/// Directive keys naming providers to import before the walk.
const PROVIDER_DIRECTIVES: &[&str] = &["__provider", "__providers"];

/// A record / replay / rerun switch: off, on with the default file, or
/// on with an explicit file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Recording {
    #[default]
    Off,
    Default,
    Path(PathBuf),
}

impl Recording {
    fn path(&self, default: impl FnOnce() -> PathBuf) -> Option<PathBuf> {
        match self {
            Recording::Off => None,
            Recording::Default => Some(default()),
            Recording::Path(p) => Some(p.clone()),
        }
    }
}

/// Values that replace nodes by key path, given inline or as a file.
#[derive(Debug, Clone, PartialEq)]
pub enum Overwrite {
    Inline(Mapping),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// File, directory, or provider reference; `None` is the current
    /// directory.
    pub source: Option<String>,
    pub no_input: bool,
    /// Seeds the `existing` tier, above `Settings::default_context`.
    pub existing_context: Mapping,
    pub overwrite_inputs: Option<Overwrite>,
    /// Working directory for the walk; created if missing.
    pub output_dir: Option<PathBuf>,
    pub record: Recording,
    pub replay: Recording,
    pub rerun: Recording,
    /// Refresh remote providers instead of using the cache.
    pub latest: bool,
    pub settings: Settings,
}

impl RunOptions {
    pub fn new(settings: Settings) -> Self {
        Self {
            source: None,
            no_input: false,
            existing_context: Mapping::new(),
            overwrite_inputs: None,
            output_dir: None,
            record: Recording::Off,
            replay: Recording::Off,
            rerun: Recording::Off,
            latest: false,
            settings,
        }
    }
}

/// Run with providers fetched by `git`. Returns the public context.
pub fn run(options: RunOptions) -> Result<Mapping, EngineError> {
    run_with(options, &GitFetcher::new())
}

/// A located document with the registry its walk resolves hooks in.
#[derive(Debug)]
pub struct Loaded {
    pub path: PathBuf,
    pub document: Mapping,
    pub base_dir: PathBuf,
    pub registry: HookRegistry,
}

/// Locate and parse the document for `source`, then import every hook
/// it can reach.
pub fn load(
    source: Option<&str>,
    settings: &Settings,
    latest: bool,
    fetcher: &dyn ProviderFetcher,
) -> Result<Loaded, EngineError> {
    let cache = ProviderCache::new(&settings.provider_dir);
    let path = source::locate(source, settings, &cache, fetcher, latest)?;
    let document = source::load_document(&path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let registry = build_registry(&document, &base_dir, settings, &cache, fetcher, latest)?;
    Ok(Loaded { path, document, base_dir, registry })
}

pub fn run_with(options: RunOptions, fetcher: &dyn ProviderFetcher) -> Result<Mapping, EngineError> {
    let settings = &options.settings;
    let Loaded { path: document_path, document, base_dir, registry } =
        load(options.source.as_deref(), settings, options.latest, fetcher)?;
    tracing::info!(document = %document_path.display(), "starting run");

    let mut existing = settings.default_context.clone();
    for (k, v) in &options.existing_context {
        existing.insert(k.clone(), v.clone());
    }
    let mut store = ContextStore::new(existing);

    let rerun_path = options.rerun.path(|| replay::default_rerun_path(&document_path));
    let replay_path = match &rerun_path {
        Some(p) => Some(p.clone()),
        None => options
            .replay
            .path(|| replay::default_record_path(&settings.replay_dir, &document_path)),
    };
    if let Some(path) = &replay_path {
        if rerun_path.is_none() && !path.exists() {
            return Err(EngineError::Source {
                message: format!("replay file not found: {}", path.display()),
            });
        }
        let inputs = replay::load(path)?;
        tracing::info!(path = %path.display(), entries = inputs.len(), "replaying inputs");
        replay::apply(&mut store, &inputs)?;
    }
    if let Some(overwrite) = &options.overwrite_inputs {
        apply_overwrite(&mut store, overwrite)?;
    }

    let renderer = TeraRenderer::new();
    let mut walker = Walker::new(&registry, &renderer, store, base_dir.clone()).no_input(options.no_input);
    let result = match &options.output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            let _cwd = CwdGuard::enter(dir)?;
            walker.walk_document(&document)
        }
        None => walker.walk_document(&document),
    };

    if let Some(path) = &rerun_path {
        match (replay::save(path, walker.recorded()), &result) {
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(_)) => tracing::warn!(error = %e, "could not write rerun file"),
            (Ok(()), _) => {}
        }
    }
    result?;

    if let Some(path) = options
        .record
        .path(|| replay::default_record_path(&settings.replay_dir, &document_path))
    {
        replay::save(&path, walker.recorded())?;
    }
    Ok(walker.into_store().public)
}

/// Built-ins, then hooks next to the document, then configured providers,
/// then the document's own `__provider` / `__providers`.
fn build_registry(
    document: &Mapping,
    base_dir: &Path,
    settings: &Settings,
    cache: &ProviderCache,
    fetcher: &dyn ProviderFetcher,
    latest: bool,
) -> Result<HookRegistry, EngineError> {
    let mut registry = HookRegistry::new();
    register_builtins(&mut registry)?;
    let local = registry.register_local_dir(base_dir)?;
    tracing::debug!(dir = %base_dir.display(), hooks = local, "registered local hooks");

    let mut references: Vec<(Value, &Path)> = settings
        .extra_providers
        .iter()
        .map(|v| (v.clone(), settings.hookwalk_dir.as_path()))
        .collect();
    for key in PROVIDER_DIRECTIVES {
        match document.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::Sequence(items)) => references.extend(items.iter().map(|v| (v.clone(), base_dir))),
            Some(other) => references.push((other.clone(), base_dir)),
        }
    }
    for (value, relative_to) in references {
        let mut reference = ProviderRef::parse(&value, settings, relative_to)?;
        reference.latest |= latest;
        registry.import_provider(&reference, cache, fetcher)?;
    }
    Ok(registry)
}

fn apply_overwrite(store: &mut ContextStore, overwrite: &Overwrite) -> Result<(), EngineError> {
    let entries = match overwrite {
        Overwrite::Inline(map) => map.clone(),
        Overwrite::File(path) => source::load_document(path)?,
    };
    for (k, v) in entries {
        let path = key_to_string(&k).ok_or_else(|| EngineError::Source {
            message: "overwrite keys must be key paths".into(),
        })?;
        store.set_override(path, v);
    }
    Ok(())
}

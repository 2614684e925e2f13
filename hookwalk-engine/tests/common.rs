#![allow(dead_code)]

use std::path::{Path, PathBuf};

use hookwalk_core::{ContextStore, Mapping, Settings};
use hookwalk_engine::{run_with, EngineError, RunOptions, Walker};
use hookwalk_hooks::register_builtins;
use hookwalk_registry::{HookRegistry, ProviderFetcher, RegistryError};
use hookwalk_renderer::TeraRenderer;

pub fn mapping(s: &str) -> Mapping {
    serde_yaml::from_str(s).unwrap()
}

/// Walk an in-memory document with only the built-ins registered.
pub fn walk(doc: &str) -> Result<Mapping, EngineError> {
    let mut registry = HookRegistry::new();
    register_builtins(&mut registry).unwrap();
    let renderer = TeraRenderer::new();
    let mut walker =
        Walker::new(&registry, &renderer, ContextStore::default(), "/nonexistent").no_input(true);
    walker.walk_document(&mapping(doc))?;
    Ok(walker.into_store().public)
}

/// Refuses every fetch; for runs that must not touch the network.
pub struct NoFetch;

impl ProviderFetcher for NoFetch {
    fn fetch(&self, url: &str, _revision: Option<&str>, _dest: &Path) -> Result<(), RegistryError> {
        Err(RegistryError::Fetch { url: url.into(), message: "network disabled in tests".into() })
    }
}

/// Write `doc` as `<dir>/hookwalk.yaml` and return options for it with
/// settings rooted in `dir`.
pub fn options(dir: &Path, doc: &str) -> RunOptions {
    std::fs::write(dir.join("hookwalk.yaml"), doc).unwrap();
    let mut opts = RunOptions::new(Settings::defaults_at(&dir.join("home")));
    opts.source = Some(dir.to_string_lossy().into_owned());
    opts.no_input = true;
    opts
}

pub fn run(opts: RunOptions) -> Result<Mapping, EngineError> {
    run_with(opts, &NoFetch)
}

pub fn canonical(p: &Path) -> PathBuf {
    std::fs::canonicalize(p).unwrap()
}

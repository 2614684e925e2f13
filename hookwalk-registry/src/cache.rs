//! On-disk provider cache.
//!
//! # Storage layout
//!
//! ```text
//! <provider_dir>/
//!   <name>-<sha256(url)[..12]>/
//!     <revision|default>/            checked-out provider
//!       .hookwalk-provider.json      {source, revision, fetched_at}
//!     <revision|default>.lock        exclusive while fetching
//!     <revision|default>.partial/    in-flight fetch, renamed into place
//! ```
//!
//! An entry with metadata is reused until a caller asks for `latest`.
//! Fetches of one entry are serialized by an in-process mutex plus an
//! exclusive file lock, so concurrent runs never see a half-written entry.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{io_err, RegistryError};
use crate::fetch::ProviderFetcher;

pub const METADATA_FILE: &str = ".hookwalk-provider.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub source: String,
    pub revision: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ProviderCache {
    root: PathBuf,
    guards: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

fn slug(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let last = last.strip_suffix(".git").unwrap_or(last);
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "provider".into()
    } else {
        cleaned
    }
}

impl ProviderCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<name>-<hash>/<revision|default>`; pure, no I/O.
    pub fn entry_dir(&self, url: &str, revision: Option<&str>) -> PathBuf {
        let digest = hex::encode(Sha256::digest(url.as_bytes()));
        self.root
            .join(format!("{}-{}", slug(url), &digest[..12]))
            .join(revision.map(|r| r.replace(['/', '\\'], "_")).unwrap_or_else(|| "default".into()))
    }

    /// Metadata of a cached entry, if it was completely fetched.
    pub fn metadata(&self, entry: &Path) -> Result<Option<ProviderMetadata>, RegistryError> {
        let path = entry.join(METADATA_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Return the directory holding `url` at `revision`, fetching it when it
    /// is missing or when `latest` is set.
    pub fn ensure(
        &self,
        url: &str,
        revision: Option<&str>,
        latest: bool,
        fetcher: &dyn ProviderFetcher,
    ) -> Result<PathBuf, RegistryError> {
        let entry = self.entry_dir(url, revision);
        let guard = {
            let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(guards.entry(entry.clone()).or_default())
        };
        let _held = guard.lock().unwrap_or_else(|e| e.into_inner());

        let parent = entry.parent().unwrap_or(&self.root).to_path_buf();
        std::fs::create_dir_all(&parent).map_err(|e| io_err(&parent, e))?;
        let lock = self.lock_entry(&entry)?;

        if !latest && self.metadata(&entry)?.is_some() {
            tracing::debug!(url, entry = %entry.display(), "provider cache hit");
            return Ok(entry);
        }

        let partial = sibling(&entry, "partial");
        if partial.exists() {
            std::fs::remove_dir_all(&partial).map_err(|e| io_err(&partial, e))?;
        }
        if let Err(e) = fetcher.fetch(url, revision, &partial) {
            let _ = std::fs::remove_dir_all(&partial);
            return Err(e);
        }
        if entry.exists() {
            std::fs::remove_dir_all(&entry).map_err(|e| io_err(&entry, e))?;
        }
        std::fs::rename(&partial, &entry).map_err(|e| io_err(&entry, e))?;

        let meta = ProviderMetadata {
            source: url.to_owned(),
            revision: revision.map(str::to_owned),
            fetched_at: Utc::now(),
        };
        write_metadata(&entry, &meta)?;
        tracing::info!(url, entry = %entry.display(), "provider cached");

        lock.unlock().map_err(|e| io_err(&entry, e))?;
        Ok(entry)
    }

    fn lock_entry(&self, entry: &Path) -> Result<File, RegistryError> {
        let path = sibling(entry, "lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.lock().map_err(|e| io_err(&path, e))?;
        Ok(file)
    }
}

/// `<entry>.<suffix>` next to `entry`; revisions may contain dots, so this
/// appends rather than replacing an extension.
fn sibling(entry: &Path, suffix: &str) -> PathBuf {
    let name = entry
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    entry.with_file_name(format!("{name}.{suffix}"))
}

/// Atomic `.tmp` + rename write of the metadata file.
fn write_metadata(entry: &Path, meta: &ProviderMetadata) -> Result<(), RegistryError> {
    let path = entry.join(METADATA_FILE);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(meta)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    impl ProviderFetcher for CountingFetcher {
        fn fetch(&self, _url: &str, revision: Option<&str>, dest: &Path) -> Result<(), RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::create_dir_all(dest.join("hooks")).unwrap();
            std::fs::write(dest.join("REVISION"), revision.unwrap_or("default")).unwrap();
            Ok(())
        }
    }

    struct FailingFetcher;

    impl ProviderFetcher for FailingFetcher {
        fn fetch(&self, url: &str, _revision: Option<&str>, dest: &Path) -> Result<(), RegistryError> {
            std::fs::create_dir_all(dest).unwrap();
            Err(RegistryError::Fetch { url: url.into(), message: "boom".into() })
        }
    }

    #[test]
    fn entry_dir_is_stable_and_revision_scoped() {
        let cache = ProviderCache::new("/cache");
        let a = cache.entry_dir("https://github.com/o/tools.git", Some("v1"));
        let b = cache.entry_dir("https://github.com/o/tools.git", Some("v1"));
        let c = cache.entry_dir("https://github.com/o/tools.git", None);
        assert_eq!(a, b);
        assert_eq!(a.parent(), c.parent());
        assert!(a.ends_with("v1"));
        assert!(c.ends_with("default"));
        let name = a.parent().unwrap().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("tools-"), "got {name}");
    }

    #[test]
    fn second_ensure_hits_cache_and_latest_refetches() {
        let tmp = TempDir::new().unwrap();
        let cache = ProviderCache::new(tmp.path());
        let fetcher = CountingFetcher { calls: AtomicUsize::new(0) };
        let url = "https://example.com/p.git";

        let dir = cache.ensure(url, Some("v1"), false, &fetcher).unwrap();
        assert_eq!(std::fs::read_to_string(dir.join("REVISION")).unwrap(), "v1");
        let meta = cache.metadata(&dir).unwrap().unwrap();
        assert_eq!(meta.source, url);
        assert_eq!(meta.revision.as_deref(), Some("v1"));

        cache.ensure(url, Some("v1"), false, &fetcher).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        cache.ensure(url, Some("v1"), true, &fetcher).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(!sibling(&dir, "partial").exists());
    }

    #[test]
    fn failed_fetch_leaves_no_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = ProviderCache::new(tmp.path());
        let url = "https://example.com/broken.git";
        let err = cache.ensure(url, None, false, &FailingFetcher).unwrap_err();
        assert!(matches!(err, RegistryError::Fetch { .. }));
        let entry = cache.entry_dir(url, None);
        assert!(!entry.exists());
        assert!(cache.metadata(&entry).unwrap().is_none());
        assert!(!sibling(&entry, "partial").exists());
    }

    #[test]
    fn concurrent_ensure_fetches_once() {
        let tmp = TempDir::new().unwrap();
        let cache = Arc::new(ProviderCache::new(tmp.path()));
        let fetcher = Arc::new(CountingFetcher { calls: AtomicUsize::new(0) });
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let fetcher = Arc::clone(&fetcher);
                std::thread::spawn(move || {
                    cache
                        .ensure("https://example.com/shared.git", None, false, fetcher.as_ref())
                        .unwrap()
                })
            })
            .collect();
        let dirs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(dirs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }
}

//! Provider references.
//!
//! Accepted forms:
//!
//! ```yaml
//! __provider: ./local/hooks            # path, relative to the document
//! __provider: gh:owner/repo@v1.2.0     # abbreviation + pinned revision
//! __providers:
//!   - https://git.example.com/x.git
//!   - {src: gl:group/repo, version: main, latest: true}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use hookwalk_core::{Settings, Value};

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderLocation {
    Local(PathBuf),
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRef {
    pub location: ProviderLocation,
    pub version: Option<String>,
    /// Bypass the cache and refresh.
    pub latest: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderSpec {
    src: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    latest: bool,
}

fn looks_remote(s: &str) -> bool {
    ["http://", "https://", "ssh://", "git://", "file://", "git@"]
        .iter()
        .any(|p| s.starts_with(p))
        || s.ends_with(".git")
}

/// Split a trailing `@revision`, leaving `git@host:...` alone.
fn split_version(s: &str) -> (&str, Option<&str>) {
    match s.rsplit_once('@') {
        Some((src, rev)) if !src.is_empty() && !rev.is_empty() && !rev.contains(['/', ':']) => {
            (src, Some(rev))
        }
        _ => (s, None),
    }
}

impl ProviderRef {
    /// Parse a `__provider` entry. Relative paths resolve against `base_dir`.
    pub fn parse(value: &Value, settings: &Settings, base_dir: &Path) -> Result<Self, RegistryError> {
        match value {
            Value::String(s) => Self::parse_str(s, settings, base_dir),
            Value::Mapping(_) => {
                let spec: ProviderSpec = serde_yaml::from_value(value.clone()).map_err(|e| {
                    RegistryError::InvalidProviderRef {
                        reference: serde_yaml::to_string(value).unwrap_or_default(),
                        message: e.to_string(),
                    }
                })?;
                let mut r = Self::parse_str(&spec.src, settings, base_dir)?;
                if spec.version.is_some() {
                    r.version = spec.version;
                }
                r.latest = spec.latest;
                Ok(r)
            }
            other => Err(RegistryError::InvalidProviderRef {
                reference: serde_yaml::to_string(other).unwrap_or_default(),
                message: "expected a string or a mapping with 'src'".into(),
            }),
        }
    }

    fn parse_str(s: &str, settings: &Settings, base_dir: &Path) -> Result<Self, RegistryError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RegistryError::InvalidProviderRef {
                reference: s.into(),
                message: "empty reference".into(),
            });
        }
        let (src, version) = split_version(s);
        let location = if let Some(url) = settings.expand_abbreviation(src) {
            ProviderLocation::Remote(url)
        } else if looks_remote(src) {
            ProviderLocation::Remote(src.to_owned())
        } else {
            ProviderLocation::Local(base_dir.join(src))
        };
        Ok(Self {
            location,
            version: version.map(str::to_owned),
            latest: false,
        })
    }

    /// Short name: last path component without `.git`.
    pub fn name(&self) -> String {
        let raw = match &self.location {
            ProviderLocation::Local(p) => p.to_string_lossy().into_owned(),
            ProviderLocation::Remote(url) => url.clone(),
        };
        let last = raw
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()
            .unwrap_or_default()
            .to_owned();
        last.strip_suffix(".git").map(str::to_owned).unwrap_or(last)
    }

    /// Identity used to de-duplicate imports within a run.
    pub fn identity(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            ProviderLocation::Local(p) => write!(f, "{}", p.display())?,
            ProviderLocation::Remote(url) => f.write_str(url)?,
        }
        if let Some(v) = &self.version {
            write!(f, "@{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn settings() -> Settings {
        Settings::defaults_at(Path::new("/home/test"))
    }

    #[rstest]
    #[case("gh:owner/repo", "https://github.com/owner/repo.git", None)]
    #[case("gh:owner/repo@v1.0", "https://github.com/owner/repo.git", Some("v1.0"))]
    #[case("https://x.io/a/b.git@main", "https://x.io/a/b.git", Some("main"))]
    #[case("git@github.com:o/r.git", "git@github.com:o/r.git", None)]
    #[case("git@github.com:o/r.git@abc123", "git@github.com:o/r.git", Some("abc123"))]
    fn remote_refs(#[case] input: &str, #[case] url: &str, #[case] version: Option<&str>) {
        let r = ProviderRef::parse(&Value::from(input), &settings(), Path::new("/docs")).unwrap();
        assert_eq!(r.location, ProviderLocation::Remote(url.into()));
        assert_eq!(r.version.as_deref(), version);
        assert!(!r.latest);
    }

    #[test]
    fn relative_paths_resolve_against_base_dir() {
        let r = ProviderRef::parse(&Value::from("./hooks-lib"), &settings(), Path::new("/docs"))
            .unwrap();
        assert_eq!(r.location, ProviderLocation::Local(PathBuf::from("/docs/./hooks-lib")));
        assert_eq!(r.name(), "hooks-lib");
    }

    #[test]
    fn mapping_form_sets_version_and_latest() {
        let v: Value = serde_yaml::from_str("{src: 'gh:o/tools', version: v2, latest: true}").unwrap();
        let r = ProviderRef::parse(&v, &settings(), Path::new("/")).unwrap();
        assert_eq!(r.version.as_deref(), Some("v2"));
        assert!(r.latest);
        assert_eq!(r.name(), "tools");
        assert_eq!(r.to_string(), "https://github.com/o/tools.git@v2");
    }

    #[test]
    fn rejects_non_string_non_mapping() {
        let err = ProviderRef::parse(&Value::from(3), &settings(), Path::new("/")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidProviderRef { .. }));
    }
}

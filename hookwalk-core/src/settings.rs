//! User settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.hookwalk/
//!   config.yaml    (optional; every key has a default)
//!   providers/     (provider cache, see hookwalk-registry)
//!   replay/        (record/replay files)
//! ```
//!
//! `HOOKWALK_DIR`, `HOOKWALK_PROVIDER_DIR` and `HOOKWALK_REPLAY_DIR` override
//! the file. As with the rest of the crate, `load_at(home)` takes an explicit
//! home and `load()` derives it from `dirs::home_dir()`; tests use `_at`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::{Mapping, Value};

pub const ENV_DIR: &str = "HOOKWALK_DIR";
pub const ENV_PROVIDER_DIR: &str = "HOOKWALK_PROVIDER_DIR";
pub const ENV_REPLAY_DIR: &str = "HOOKWALK_REPLAY_DIR";

/// On-disk shape of `config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    provider_dir: Option<PathBuf>,
    replay_dir: Option<PathBuf>,
    abbreviations: BTreeMap<String, String>,
    default_context: Mapping,
    extra_providers: Vec<Value>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub hookwalk_dir: PathBuf,
    pub provider_dir: PathBuf,
    pub replay_dir: PathBuf,
    /// Prefix → URL template; `{0}` is replaced by the rest of the reference.
    pub abbreviations: BTreeMap<String, String>,
    /// Seeds the `existing` tier beneath caller-supplied context.
    pub default_context: Mapping,
    /// Provider references imported before every run.
    pub extra_providers: Vec<Value>,
}

fn default_abbreviations() -> BTreeMap<String, String> {
    [
        ("gh", "https://github.com/{0}.git"),
        ("gl", "https://gitlab.com/{0}.git"),
        ("bb", "https://bitbucket.org/{0}.git"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect()
}

impl Settings {
    /// Defaults rooted at `<home>/.hookwalk`, ignoring the config file.
    pub fn defaults_at(home: &Path) -> Self {
        Self::rooted(home.join(".hookwalk"))
    }

    fn rooted(dir: PathBuf) -> Self {
        Self {
            provider_dir: dir.join("providers"),
            replay_dir: dir.join("replay"),
            hookwalk_dir: dir,
            abbreviations: default_abbreviations(),
            default_context: Mapping::new(),
            extra_providers: Vec::new(),
        }
    }

    /// Load settings for `home`, applying `HOOKWALK_*` environment overrides.
    pub fn load_at(home: &Path) -> Result<Self, CoreError> {
        Self::load_with(home, |key| std::env::var(key).ok())
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, CoreError> {
        let home = dirs::home_dir().ok_or(CoreError::HomeNotFound)?;
        Self::load_at(&home)
    }

    /// Load with an injectable environment.
    pub fn load_with(
        home: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CoreError> {
        let dir = env(ENV_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join(".hookwalk"));
        let mut settings = Self::rooted(dir);

        let path = settings.config_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let file: SettingsFile = if contents.trim().is_empty() {
                SettingsFile::default()
            } else {
                serde_yaml::from_str(&contents)
                    .map_err(|e| CoreError::Parse { path: path.clone(), source: e })?
            };
            tracing::debug!(path = %path.display(), "loaded settings");
            if let Some(p) = file.provider_dir {
                settings.provider_dir = p;
            }
            if let Some(p) = file.replay_dir {
                settings.replay_dir = p;
            }
            settings.abbreviations.extend(file.abbreviations);
            settings.default_context = file.default_context;
            settings.extra_providers = file.extra_providers;
        }

        if let Some(p) = env(ENV_PROVIDER_DIR) {
            settings.provider_dir = PathBuf::from(p);
        }
        if let Some(p) = env(ENV_REPLAY_DIR) {
            settings.replay_dir = PathBuf::from(p);
        }
        Ok(settings)
    }

    pub fn config_path(&self) -> PathBuf {
        self.hookwalk_dir.join("config.yaml")
    }

    /// Expand `gh:owner/repo` style references. Returns `None` when no
    /// abbreviation prefix matches.
    pub fn expand_abbreviation(&self, reference: &str) -> Option<String> {
        let (prefix, rest) = reference.split_once(':')?;
        let template = self.abbreviations.get(prefix)?;
        Some(template.replace("{0}", rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_config_missing() {
        let home = TempDir::new().unwrap();
        let s = Settings::load_with(home.path(), no_env).unwrap();
        assert_eq!(s.hookwalk_dir, home.path().join(".hookwalk"));
        assert_eq!(s.provider_dir, home.path().join(".hookwalk/providers"));
        assert_eq!(s.replay_dir, home.path().join(".hookwalk/replay"));
        assert!(s.default_context.is_empty());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".hookwalk");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "replay_dir: /tmp/replays\nabbreviations:\n  corp: https://git.corp/{0}.git\ndefault_context:\n  team: infra\n",
        )
        .unwrap();

        let s = Settings::load_with(home.path(), no_env).unwrap();
        assert_eq!(s.replay_dir, PathBuf::from("/tmp/replays"));
        assert_eq!(
            s.default_context.get("team"),
            Some(&Value::String("infra".into()))
        );
        assert_eq!(
            s.expand_abbreviation("corp:tools/hooks").as_deref(),
            Some("https://git.corp/tools/hooks.git")
        );
        assert_eq!(
            s.expand_abbreviation("gh:owner/repo").as_deref(),
            Some("https://github.com/owner/repo.git")
        );
    }

    #[test]
    fn env_overrides_win_over_file() {
        let home = TempDir::new().unwrap();
        let custom = home.path().join("elsewhere");
        let custom_str = custom.to_string_lossy().into_owned();
        let s = Settings::load_with(home.path(), |k| match k {
            ENV_DIR => Some(custom_str.clone()),
            ENV_PROVIDER_DIR => Some("/var/cache/providers".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(s.hookwalk_dir, custom);
        assert_eq!(s.replay_dir, custom.join("replay"));
        assert_eq!(s.provider_dir, PathBuf::from("/var/cache/providers"));
    }

    #[test]
    fn malformed_config_is_a_parse_error_with_path() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".hookwalk");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "abbreviations: [unclosed").unwrap();
        let err = Settings::load_with(home.path(), no_env).unwrap_err();
        assert!(matches!(err, CoreError::Parse { .. }));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn unknown_prefix_is_not_expanded() {
        let home = TempDir::new().unwrap();
        let s = Settings::defaults_at(home.path());
        assert!(s.expand_abbreviation("./local/path").is_none());
        assert!(s.expand_abbreviation("zz:owner/repo").is_none());
    }
}

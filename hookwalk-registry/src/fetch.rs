//! Fetching remote providers.

use std::path::Path;
use std::process::Command;

use crate::error::RegistryError;

/// Materializes a remote provider into `dest`, which must not exist yet.
pub trait ProviderFetcher {
    fn fetch(&self, url: &str, revision: Option<&str>, dest: &Path) -> Result<(), RegistryError>;
}

/// Clones with the `git` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    program: String,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self { program: "git".into() }
    }
}

impl GitFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn git(&self, url: &str, args: &[&str]) -> Result<(), RegistryError> {
        let output = Command::new(&self.program)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| RegistryError::Fetch {
                url: url.to_owned(),
                message: format!("failed to run {}: {e}", self.program),
            })?;
        if output.status.success() {
            return Ok(());
        }
        Err(RegistryError::Fetch {
            url: url.to_owned(),
            message: format!(
                "`{} {}` exited with {}: {}",
                self.program,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

impl ProviderFetcher for GitFetcher {
    fn fetch(&self, url: &str, revision: Option<&str>, dest: &Path) -> Result<(), RegistryError> {
        let dest_str = dest.to_string_lossy();
        tracing::info!(url, revision = revision.unwrap_or("default"), "cloning provider");
        self.git(url, &["clone", "--quiet", url, &dest_str])?;
        if let Some(rev) = revision {
            self.git(url, &["-C", &dest_str, "checkout", "--quiet", rev])?;
        }
        Ok(())
    }
}

//! `hookwalk run`: walk a document and print the public context.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use hookwalk_core::{Mapping, Settings, Value};
use hookwalk_engine::{run, Overwrite, Recording, RunOptions};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum Format {
    #[default]
    Yaml,
    Json,
}

/// Arguments for `hookwalk run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Document file, directory, or provider reference. Defaults to the
    /// current directory.
    pub source: Option<String>,

    /// Never prompt; interactive hooks take their defaults.
    #[arg(long)]
    pub no_input: bool,

    /// YAML or JSON mapping that seeds the context.
    #[arg(long, value_name = "FILE")]
    pub context: Option<PathBuf>,

    /// YAML or JSON mapping of key paths whose nodes are replaced.
    #[arg(long, value_name = "FILE")]
    pub overwrite: Option<PathBuf>,

    /// Working directory for the walk; created if missing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Save answers to interactive hooks.
    #[arg(long, value_name = "PATH", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub record: Option<PathBuf>,

    /// Reuse answers saved by `--record`.
    #[arg(long, value_name = "PATH", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub replay: Option<PathBuf>,

    /// Resume from the answers of an earlier, possibly failed, run.
    #[arg(long, value_name = "PATH", num_args = 0..=1, require_equals = true, default_missing_value = "")]
    pub rerun: Option<PathBuf>,

    /// Fetch remote providers again instead of using the cache.
    #[arg(long)]
    pub latest: bool,

    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

/// `None` → off, empty path → default location, otherwise the path.
fn recording(flag: Option<PathBuf>) -> Recording {
    match flag {
        None => Recording::Off,
        Some(p) if p.as_os_str().is_empty() => Recording::Default,
        Some(p) => Recording::Path(p),
    }
}

fn read_mapping(path: &PathBuf) -> Result<Mapping> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    match serde_yaml::from_str::<Value>(&contents)
        .with_context(|| format!("could not parse {}", path.display()))?
    {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        _ => bail!("{} must contain a mapping", path.display()),
    }
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let settings = Settings::load().context("failed to load hookwalk settings")?;
        let mut options = RunOptions::new(settings);
        options.source = self.source;
        options.no_input = self.no_input;
        if let Some(path) = &self.context {
            options.existing_context = read_mapping(path)?;
        }
        options.overwrite_inputs = self.overwrite.map(Overwrite::File);
        options.output_dir = self.output_dir;
        options.record = recording(self.record);
        options.replay = recording(self.replay);
        options.rerun = recording(self.rerun);
        options.latest = self.latest;

        let label = options.source.clone().unwrap_or_else(|| ".".into());
        let public = run(options).with_context(|| format!("run failed for '{label}'"))?;

        match self.format {
            Format::Yaml => {
                if !public.is_empty() {
                    print!("{}", serde_yaml::to_string(&public)?);
                }
            }
            Format::Json => println!("{}", serde_json::to_string_pretty(&public)?),
        }
        eprintln!("{} {}", "done".green().bold(), label);
        Ok(())
    }
}

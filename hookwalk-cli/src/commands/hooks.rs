//! `hookwalk hooks`: list resolvable hook types.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use hookwalk_core::Settings;
use hookwalk_engine::load;
use hookwalk_registry::GitFetcher;

/// Arguments for `hookwalk hooks`.
#[derive(Args, Debug)]
pub struct HooksArgs {
    /// Document file, directory, or provider reference whose hooks to list.
    pub source: Option<String>,

    /// Fetch remote providers again instead of using the cache.
    #[arg(long)]
    pub latest: bool,
}

#[derive(Tabled)]
struct HookRow {
    #[tabled(rename = "type")]
    name: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "help")]
    help: String,
}

impl HooksArgs {
    pub fn run(self) -> Result<()> {
        let settings = Settings::load().context("failed to load hookwalk settings")?;
        let loaded = load(self.source.as_deref(), &settings, self.latest, &GitFetcher::new())
            .context("could not load document")?;

        let rows: Vec<HookRow> = loaded
            .registry
            .available(Some(&loaded.base_dir))
            .into_iter()
            .map(|(name, d)| HookRow {
                name,
                source: d.source.to_string(),
                help: d.schema.help.clone().unwrap_or_default(),
            })
            .collect();

        eprintln!(
            "{} {} hook types for {}",
            "found".cyan().bold(),
            rows.len(),
            loaded.path.display()
        );
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

//! hookwalk: run declarative automation documents.
//!
//! # Usage
//!
//! ```text
//! hookwalk run [SOURCE] [--no-input] [--context FILE] [--overwrite FILE]
//!              [--output-dir DIR] [--record[=PATH]] [--replay[=PATH]]
//!              [--rerun[=PATH]] [--latest] [--format yaml|json]
//! hookwalk hooks [SOURCE]
//! ```
//!
//! `SOURCE` is a document file, a directory holding `hookwalk.yaml`, or a
//! provider reference such as `gh:owner/repo@v1`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{hooks::HooksArgs, run::RunArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "hookwalk",
    version,
    about = "Walk declarative hook documents",
    long_about = None,
)]
struct Cli {
    /// Log resolution and execution details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk a document and print its public context.
    Run(RunArgs),

    /// List the hook types a document can call.
    Hooks(HooksArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Hooks(args) => args.run(),
    }
}

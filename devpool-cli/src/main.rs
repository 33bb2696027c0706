//! devpool: mirror partner issues into a central devpool repository.
//!
//! # Usage
//!
//! ```text
//! devpool init <owner/repo> [--config devpool.yaml]
//! devpool sync [--dry-run] [--json] [--config devpool.yaml]
//! devpool stats [--json] [--config devpool.yaml]
//! ```
//!
//! The GitHub token is read from `DEVPOOL_GITHUB_TOKEN` or `GITHUB_TOKEN`;
//! a `.env` file in the working directory is loaded first.

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{init::InitArgs, stats::StatsArgs, sync::SyncArgs};
use devpool_core::config::DEFAULT_CONFIG_FILE;
use devpool_core::RepoRef;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "devpool",
    version,
    about = "Mirror priced partner issues into a devpool repository",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter configuration file.
    Init(InitArgs),

    /// Run one reconciliation pass.
    Sync(SyncArgs),

    /// Print aggregate reward statistics for the standard devpool.
    Stats(StatsArgs),
}

// ---------------------------------------------------------------------------
// Shared repository argument
// ---------------------------------------------------------------------------

/// `owner/repo` or a full GitHub repository URL.
#[derive(Debug, Clone)]
pub struct RepoArg(pub RepoRef);

impl FromStr for RepoArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let url = if s.contains("://") {
            s.to_string()
        } else {
            format!("https://github.com/{}", s.trim_matches('/'))
        };
        RepoRef::parse_url(&url)
            .map(Self)
            .map_err(|_| format!("'{s}' is not a repository; expected owner/repo"))
    }
}

impl fmt::Display for RepoArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<RepoArg> for RepoRef {
    fn from(r: RepoArg) -> Self {
        r.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(&cli.config),
        Commands::Sync(args) => args.run(&cli.config),
        Commands::Stats(args) => args.run(&cli.config),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

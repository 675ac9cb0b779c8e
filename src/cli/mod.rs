//! Command-line interface.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;
pub mod prompt;

use crate::config::{CliOverrides, SyncConfig};
use crate::error::Result;
use crate::format::OutputContext;

/// Import flashcards from CSV files into Anki through AnkiConnect.
#[derive(Parser, Debug)]
#[command(name = "decksync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print machine-readable JSON reports
    #[arg(long, global = true)]
    pub json: bool,

    /// Also append JSON log lines to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// AnkiConnect URL (default http://localhost:8765)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile CSV cards with Anki and import them
    Import(ImportArgs),

    /// Apply a saved decision plan without re-reading the CSV
    Apply(ApplyArgs),

    /// Check that AnkiConnect is reachable and the note types exist
    Check,

    /// Summarize a CSV file without contacting Anki
    Preview(PreviewArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ImportArgs {
    /// CSV file to import
    #[arg(long, value_name = "CSV", required_unless_present = "folder", conflicts_with = "folder")]
    pub file: Option<PathBuf>,

    /// Import every CSV file below this folder
    #[arg(long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Base deck prepended to every row's deck ('-' for none)
    #[arg(long, visible_alias = "base-deck", value_name = "DECK")]
    pub base_collection: Option<String>,

    /// Review duplicates interactively and save the approved plan first
    #[arg(long)]
    pub dry_run: bool,

    /// Apply this decision plan instead of the one next to the CSV
    #[arg(long, value_name = "PLAN", conflicts_with = "dry_run")]
    pub use_cache: Option<PathBuf>,

    /// Never prompt; use configured defaults
    #[arg(long)]
    pub headless: bool,

    /// Replace every differing duplicate without asking
    #[arg(long, conflicts_with = "skip_duplicates")]
    pub overwrite_all: bool,

    /// Skip every differing duplicate without asking
    #[arg(long)]
    pub skip_duplicates: bool,

    /// Where to write per-card failures
    #[arg(long, value_name = "PATH")]
    pub failure_log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    /// Decision plan written by a dry run
    pub plan: PathBuf,

    /// Where to write per-card failures
    #[arg(long, value_name = "PATH")]
    pub failure_log: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    /// CSV file to summarize
    pub csv: PathBuf,
}

/// How a command ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// The user stopped the run from a prompt.
    Cancelled,
}

impl RunStatus {
    /// The single line shown to the user when the run ends this way.
    #[must_use]
    pub const fn notice(self) -> Option<&'static str> {
        match self {
            Self::Completed => None,
            Self::Cancelled => Some("Dry run cancelled by user."),
        }
    }
}

impl Cli {
    /// Config overrides taken from flags.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            endpoint: self.endpoint.clone(),
            timeout_secs: self.timeout,
            ..CliOverrides::default()
        };
        match &self.command {
            Commands::Import(args) => {
                overrides.base_collection.clone_from(&args.base_collection);
                overrides.failure_log.clone_from(&args.failure_log);
            }
            Commands::Apply(args) => {
                overrides.failure_log.clone_from(&args.failure_log);
            }
            Commands::Check | Commands::Preview(_) => {}
        }
        overrides
    }
}

/// Dispatch a parsed command.
///
/// # Errors
///
/// Returns the error of the command that ran.
pub fn run(command: &Commands, config: &SyncConfig, ctx: &OutputContext) -> Result<RunStatus> {
    match command {
        Commands::Import(args) => commands::import::execute(args, config, ctx),
        Commands::Apply(args) => commands::apply::execute(args, config, ctx),
        Commands::Check => commands::check::execute(config, ctx).map(|()| RunStatus::Completed),
        Commands::Preview(args) => {
            commands::preview::execute(args, config, ctx).map(|()| RunStatus::Completed)
        }
    }
}

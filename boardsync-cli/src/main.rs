//! boardsync: keep a project board in line with a TASKS.md document.
//!
//! # Usage
//!
//! ```text
//! boardsync sync <TASKS.md> [--owner <login> --project <n> | --board-file <board.json>]
//!                [--scope-label <label>] [--repo <owner/name>] [--match-titles]
//!                [--dry-run] [--writeback] [--prune-done] [--json] [--output-json <file>]
//! boardsync plan <TASKS.md> [board options] [--json]
//! boardsync check <TASKS.md> [--json]
//! boardsync prune <TASKS.md> [--dry-run]
//! ```

mod backend;
mod commands;
mod report;

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{check::CheckArgs, plan::PlanArgs, prune::PruneArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "boardsync",
    version,
    about = "Reconcile a TASKS.md document with a GitHub project board",
    long_about = None,
)]
struct Cli {
    /// Log engine decisions at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, update, convert and archive board items to match the document.
    Sync(SyncArgs),

    /// Show the operations a sync would run, without running them.
    Plan(PlanArgs),

    /// Parse the document and list its tasks by status.
    Check(CheckArgs),

    /// Remove tasks under the Done section from the document.
    Prune(PruneArgs),
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Check(args) => args.run(),
        Commands::Prune(args) => args.run(),
    }
}

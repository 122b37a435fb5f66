//! `boardsync sync`: reconcile the board with the task document.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use boardsync_markdown::{parse_file, remove_done_tasks_file, writeback_file, IdAssignment};
use boardsync_sync::{pipeline, CancelFlag, ExecutionReport, Mode};

use crate::backend::BoardArgs;
use crate::report;

/// Arguments for `boardsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Report what would change without touching the board.
    #[arg(long)]
    pub dry_run: bool,

    /// Record new and linked board ids in the document.
    #[arg(long)]
    pub writeback: bool,

    /// Remove tasks under `## Done` after a fully successful apply.
    #[arg(long)]
    pub prune_done: bool,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    /// Also write the JSON report to this file.
    #[arg(long)]
    pub output_json: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let document = &self.board.document;
        let parsed = parse_file(document)
            .with_context(|| format!("failed to read {}", document.display()))?;
        report::print_parse_warnings(&parsed.diagnostics);

        let (config, mut remote) = self.board.connect()?;
        let mode = if self.dry_run { Mode::Preview } else { Mode::Apply };
        let report = pipeline::run(&mut remote, &parsed.tasks, &config, mode, CancelFlag::new())
            .context("sync failed")?;

        if self.json {
            println!("{}", report::report_json(&report)?);
        } else {
            report::print_report(&report);
        }
        if let Some(path) = &self.output_json {
            std::fs::write(path, report::report_json(&report)?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        match mode {
            Mode::Apply => {
                if self.writeback {
                    write_ids(document, &report)?;
                }
                if self.prune_done {
                    prune(document, &report)?;
                }
            }
            Mode::Preview => {
                if self.writeback || self.prune_done {
                    eprintln!("[dry-run] document left unchanged");
                }
            }
        }

        Ok(if report.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}

fn write_ids(document: &Path, report: &ExecutionReport) -> Result<()> {
    let assignments: Vec<IdAssignment> = report
        .id_assignments()
        .into_iter()
        .map(|link| IdAssignment {
            position: link.position,
            id: link.id,
        })
        .collect();
    let changed = writeback_file(document, &assignments)
        .with_context(|| format!("failed to write ids into {}", document.display()))?;
    if changed {
        println!("{} recorded {} id(s) in {}", "✎".green(), assignments.len(), document.display());
    }
    Ok(())
}

fn prune(document: &Path, report: &ExecutionReport) -> Result<()> {
    if !report.is_success() {
        eprintln!(
            "{} not pruning done tasks: the sync did not fully succeed",
            "warning:".yellow().bold()
        );
        return Ok(());
    }
    let changed = remove_done_tasks_file(document)
        .with_context(|| format!("failed to prune {}", document.display()))?;
    if changed {
        println!("{} removed done tasks from {}", "✎".green(), document.display());
    }
    Ok(())
}

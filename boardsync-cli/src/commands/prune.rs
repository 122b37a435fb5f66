//! `boardsync prune`: drop finished tasks from the document.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use boardsync_markdown::{remove_done_tasks, remove_done_tasks_file};

/// Arguments for `boardsync prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Path to the task document.
    pub document: PathBuf,

    /// Report whether anything would be removed without rewriting the file.
    #[arg(long)]
    pub dry_run: bool,
}

impl PruneArgs {
    pub fn run(self) -> Result<ExitCode> {
        let path = &self.document;
        if self.dry_run {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match remove_done_tasks(&content) {
                Some(_) => println!("[dry-run] would remove done tasks from {}", path.display()),
                None => println!("[dry-run] nothing to prune in {}", path.display()),
            }
            return Ok(ExitCode::SUCCESS);
        }

        let changed = remove_done_tasks_file(path)
            .with_context(|| format!("failed to prune {}", path.display()))?;
        if changed {
            println!("removed done tasks from {}", path.display());
        } else {
            println!("nothing to prune in {}", path.display());
        }
        Ok(ExitCode::SUCCESS)
    }
}

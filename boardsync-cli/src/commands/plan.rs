//! `boardsync plan`: print the operations a sync would run.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use boardsync_markdown::parse_file;
use boardsync_sync::{pipeline, Executor, Mode};

use crate::backend::BoardArgs;
use crate::report;

/// Arguments for `boardsync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub board: BoardArgs,

    /// Print the preview report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub fn run(self) -> Result<ExitCode> {
        let document = &self.board.document;
        let parsed = parse_file(document)
            .with_context(|| format!("failed to read {}", document.display()))?;
        report::print_parse_warnings(&parsed.diagnostics);

        let (config, mut remote) = self.board.connect()?;
        let plan = pipeline::plan(&mut remote, &parsed.tasks, &config).context("planning failed")?;

        if self.json {
            let preview = Executor::new(&mut remote, Mode::Preview).run(plan);
            println!("{}", report::report_json(&preview)?);
        } else {
            report::print_plan(&plan);
        }
        Ok(ExitCode::SUCCESS)
    }
}

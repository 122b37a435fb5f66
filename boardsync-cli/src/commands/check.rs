//! `boardsync check`: parse the document and show what it contains.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use boardsync_core::types::Task;
use boardsync_markdown::parse_file;

use crate::report;

/// Arguments for `boardsync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the task document.
    pub document: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct CheckJson<'a> {
    tasks: &'a [Task],
    diagnostics: Vec<DiagnosticJson<'a>>,
}

#[derive(Serialize)]
struct DiagnosticJson<'a> {
    line: usize,
    message: &'a str,
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "task")]
    title: String,
    #[tabled(rename = "id")]
    id: String,
    #[tabled(rename = "due")]
    due: String,
    #[tabled(rename = "assignee")]
    assignee: String,
    #[tabled(rename = "labels")]
    labels: String,
    #[tabled(rename = "line")]
    line: usize,
}

impl CheckArgs {
    pub fn run(self) -> Result<ExitCode> {
        let parsed = parse_file(&self.document)
            .with_context(|| format!("failed to read {}", self.document.display()))?;

        if self.json {
            let payload = CheckJson {
                tasks: &parsed.tasks,
                diagnostics: parsed
                    .diagnostics
                    .iter()
                    .map(|d| DiagnosticJson {
                        line: d.line,
                        message: &d.message,
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize check JSON")?
            );
            return Ok(ExitCode::SUCCESS);
        }

        report::print_parse_warnings(&parsed.diagnostics);
        let unlinked = parsed.unlinked().count();
        println!(
            "{} | {} tasks | {} without a board id",
            self.document.display(),
            parsed.tasks.len(),
            unlinked
        );
        for (status, tasks) in parsed.by_status() {
            println!("{}", status.to_uppercase().bold());
            let rows: Vec<TaskRow> = tasks
                .into_iter()
                .map(|task| TaskRow {
                    title: task.title.clone(),
                    id: task
                        .id
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "-".to_string()),
                    due: task
                        .due
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    assignee: task
                        .assignee
                        .as_ref()
                        .map(|a| format!("@{a}"))
                        .unwrap_or_else(|| "-".to_string()),
                    labels: task.labels.iter().cloned().collect::<Vec<_>>().join(", "),
                    line: task.position.0,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        Ok(ExitCode::SUCCESS)
    }
}

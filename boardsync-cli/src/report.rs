//! Human and JSON output for plans and execution reports.

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use boardsync_core::types::FieldSet;
use boardsync_markdown::ParseDiagnostic;
use boardsync_sync::{Diagnostic, ExecutionReport, Mode, OperationKind, Outcome, Plan};

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "op")]
    op: String,
    #[tabled(rename = "task")]
    title: String,
    #[tabled(rename = "item")]
    item: String,
    #[tabled(rename = "fields")]
    fields: String,
    #[tabled(rename = "result")]
    outcome: String,
}

fn join_fields(fields: &FieldSet) -> String {
    if fields.is_empty() {
        return "-".to_string();
    }
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn op_marker(kind: OperationKind) -> String {
    match kind {
        OperationKind::Create => "+".green().bold().to_string(),
        OperationKind::Update => "~".yellow().bold().to_string(),
        OperationKind::Convert => ">".cyan().bold().to_string(),
        OperationKind::Archive => "-".red().bold().to_string(),
    }
}

fn outcome_label(outcome: &Outcome) -> String {
    match outcome.error() {
        Some(error) => format!("{}: {error}", outcome.label()),
        None => outcome.label().to_string(),
    }
}

pub fn print_parse_warnings(diagnostics: &[ParseDiagnostic]) {
    for d in diagnostics {
        eprintln!("{} line {}: {}", "warning:".yellow().bold(), d.line, d.message);
    }
}

pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        let tag = if d.is_error() {
            "skipped:".red().bold()
        } else {
            "warning:".yellow().bold()
        };
        eprintln!("{tag} {d}");
    }
}

pub fn print_plan(plan: &Plan) {
    print_diagnostics(plan.diagnostics());
    if plan.is_empty() {
        println!("{} board is up to date ({})", "✓".green().bold(), plan.summary());
        return;
    }
    for op in plan.operations() {
        let line = op.to_string();
        // The marker is the first character of the rendered line.
        let rest = line.get(1..).unwrap_or_default();
        println!("{}{rest}", op_marker(op.kind()));
    }
    println!("{}", plan.summary());
}

pub fn print_report(report: &ExecutionReport) {
    print_diagnostics(&report.diagnostics);
    let prefix = match report.mode {
        Mode::Preview => "[dry-run] ",
        Mode::Apply => "",
    };

    if report.results.is_empty() {
        println!(
            "{prefix}{} board is up to date ({} unchanged, {} skipped)",
            "✓".green().bold(),
            report.summary.unchanged,
            report.summary.skipped
        );
        return;
    }

    let rows: Vec<ResultRow> = report
        .results
        .iter()
        .map(|r| ResultRow {
            op: r.kind.to_string(),
            title: r.title.clone(),
            item: r
                .new_id
                .as_ref()
                .or(r.item_id.as_ref())
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string()),
            fields: join_fields(&r.fields),
            outcome: outcome_label(&r.outcome),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    let failed = report.failed() + report.partial() + report.cancelled();
    let status = if failed == 0 {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!(
        "{prefix}{status} {} applied, {} partial, {} failed, {} cancelled | {}",
        report.applied(),
        report.partial(),
        report.failed(),
        report.cancelled(),
        report.summary
    );
}

pub fn report_json(report: &ExecutionReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report JSON")
}

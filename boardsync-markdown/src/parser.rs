//! Parser for `TASKS.md` documents.
//!
//! ```text
//! ## In Progress                 <- status section
//! ### Fix login redirect         <- task
//! <!-- id: PVTI_abc -->          <- metadata zone (any order, blank lines ok)
//! - **Assignee:** @alice
//! - **Labels:** bug, auth
//! - **Due:** 2024-07-01
//! Users land on /404 after ...   <- first other line starts the description
//! ```
//!
//! Parsing never fails. Lines that look like metadata but cannot be used are
//! skipped and reported as [`ParseDiagnostic`]s.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use boardsync_core::types::{ItemId, SourcePosition, Task};

use crate::error::{io_err, DocumentError};

/// Status given to tasks that appear before any `##` section.
pub const DEFAULT_STATUS: &str = "Todo";

fn status_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^##\s+(.+)$").expect("static regex"))
}

fn task_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^###\s+(.*)$").expect("static regex"))
}

fn id_comment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<!--\s*id:\s*(\S+)\s*-->$").expect("static regex"))
}

fn metadata_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-\s+\*\*([^*:]+):\*\*\s*(.*)$").expect("static regex"))
}

pub(crate) fn is_status_heading(line: &str) -> Option<&str> {
    status_heading()
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

pub(crate) fn is_metadata_line(line: &str) -> bool {
    metadata_line().is_match(line.trim_end())
}

pub(crate) fn is_task_heading(line: &str) -> bool {
    task_heading().is_match(line)
}

pub(crate) fn id_in_comment(line: &str) -> Option<&str> {
    id_comment()
        .captures(line.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// A non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDiagnostic {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// Tasks in document order plus parser warnings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDocument {
    pub tasks: Vec<Task>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParsedDocument {
    /// Tasks grouped by status, groups in order of first appearance.
    pub fn by_status(&self) -> Vec<(&str, Vec<&Task>)> {
        let mut groups: Vec<(&str, Vec<&Task>)> = Vec::new();
        for task in &self.tasks {
            match groups.iter_mut().find(|(s, _)| *s == task.status) {
                Some((_, tasks)) => tasks.push(task),
                None => groups.push((task.status.as_str(), vec![task])),
            }
        }
        groups
    }

    /// Tasks with no board id yet.
    pub fn unlinked(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| t.id.is_none())
    }
}

/// Normalize a status heading to its canonical spelling.
pub fn normalize_status(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.to_lowercase().as_str() {
        "todo" | "to do" | "to-do" => "Todo".to_string(),
        "in progress" | "in-progress" | "inprogress" => "In Progress".to_string(),
        "done" | "completed" | "closed" => "Done".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Parse a task document.
pub fn parse(content: &str) -> ParsedDocument {
    let mut doc = ParsedDocument::default();
    let mut status: Option<String> = None;
    let mut current: Option<TaskBuilder> = None;
    // Set while skipping the body of a heading that could not become a task.
    let mut skipping = false;

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;

        if let Some(heading) = is_status_heading(line) {
            if let Some(builder) = current.take() {
                doc.tasks.push(builder.build());
            }
            skipping = false;
            status = Some(normalize_status(heading));
            continue;
        }

        if let Some(caps) = task_heading().captures(line) {
            if let Some(builder) = current.take() {
                doc.tasks.push(builder.build());
            }
            let title = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            if title.is_empty() {
                doc.diagnostics.push(ParseDiagnostic {
                    line: line_no,
                    message: "task heading has no title; skipped".to_string(),
                });
                skipping = true;
                continue;
            }
            skipping = false;
            let task_status = match &status {
                Some(s) => s.clone(),
                None => {
                    doc.diagnostics.push(ParseDiagnostic {
                        line: line_no,
                        message: format!(
                            "task '{title}' appears before any status section; using '{DEFAULT_STATUS}'"
                        ),
                    });
                    DEFAULT_STATUS.to_string()
                }
            };
            current = Some(TaskBuilder::new(title, task_status, line_no));
            continue;
        }

        if skipping {
            continue;
        }
        if let Some(builder) = current.as_mut() {
            builder.feed_line(line, line_no, &mut doc.diagnostics);
        }
    }

    if let Some(builder) = current.take() {
        doc.tasks.push(builder.build());
    }

    tracing::debug!(
        "parsed {} task(s) with {} diagnostic(s)",
        doc.tasks.len(),
        doc.diagnostics.len()
    );
    doc
}

/// Parse a task document from disk.
pub fn parse_file(path: &Path) -> Result<ParsedDocument, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(parse(&content))
}

// ---------------------------------------------------------------------------
// Task builder
// ---------------------------------------------------------------------------

struct TaskBuilder {
    title: String,
    status: String,
    line: usize,
    id: Option<ItemId>,
    assignee: Option<String>,
    labels: BTreeSet<String>,
    due: Option<NaiveDate>,
    description: Vec<String>,
    in_metadata: bool,
}

impl TaskBuilder {
    fn new(title: &str, status: String, line: usize) -> Self {
        Self {
            title: title.to_string(),
            status,
            line,
            id: None,
            assignee: None,
            labels: BTreeSet::new(),
            due: None,
            description: Vec::new(),
            in_metadata: true,
        }
    }

    fn feed_line(&mut self, line: &str, line_no: usize, diagnostics: &mut Vec<ParseDiagnostic>) {
        if !self.in_metadata {
            self.description.push(line.to_string());
            return;
        }

        if line.trim().is_empty() {
            return;
        }

        if let Some(id) = id_in_comment(line) {
            match &self.id {
                None => self.id = Some(ItemId::from(id)),
                Some(existing) => diagnostics.push(ParseDiagnostic {
                    line: line_no,
                    message: format!(
                        "task '{}' already has id {existing}; ignoring second id {id}",
                        self.title
                    ),
                }),
            }
            return;
        }

        if let Some(caps) = metadata_line().captures(line.trim_end()) {
            let key = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            let value = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
            self.feed_metadata(key, value, line_no, diagnostics);
            return;
        }

        self.in_metadata = false;
        self.description.push(line.to_string());
    }

    fn feed_metadata(
        &mut self,
        key: &str,
        value: &str,
        line_no: usize,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) {
        let mut warn = |message: String| {
            diagnostics.push(ParseDiagnostic {
                line: line_no,
                message,
            })
        };

        match key.to_lowercase().as_str() {
            "assignee" => {
                let login = value.trim_start_matches('@');
                if login.is_empty() || login.contains(char::is_whitespace) {
                    warn(format!("malformed assignee '{value}' ignored"));
                } else {
                    self.assignee = Some(login.to_string());
                }
            }
            "labels" => {
                let labels: BTreeSet<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                if labels.is_empty() {
                    warn("empty labels line ignored".to_string());
                } else {
                    self.labels = labels;
                }
            }
            "due" => match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(date) => self.due = Some(date),
                Err(_) => warn(format!("malformed due date '{value}' ignored; expected YYYY-MM-DD")),
            },
            _ => warn(format!("unsupported metadata key '{key}' ignored")),
        }
    }

    fn build(self) -> Task {
        let description = self.description.join("\n").trim().to_string();
        Task {
            title: self.title,
            status: self.status,
            id: self.id,
            assignee: self.assignee,
            labels: self.labels,
            description,
            due: self.due,
            position: SourcePosition(self.line),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

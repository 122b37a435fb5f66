//! Plan builder: matcher partitions in, ordered operations out.
//!
//! Operation order is fixed: archives (board order), converts, updates,
//! creates (document order). Building a plan has no side effects; the
//! [`Executor`](crate::Executor) is the only consumer.

use std::fmt;

use serde::Serialize;

use boardsync_core::config::SyncConfig;
use boardsync_core::types::{Board, BoardItem, ContentKind, FieldSet, ItemId, SourcePosition, Task};

use crate::compare::{changed_fields, desired_kind};
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::matcher::{match_tasks, MatchedBy};

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Convert,
    Archive,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Convert => write!(f, "convert"),
            OperationKind::Archive => write!(f, "archive"),
        }
    }
}

/// One planned board mutation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Archive {
        item: BoardItem,
    },
    Convert {
        task: Task,
        item: BoardItem,
        target: ContentKind,
    },
    /// `changes` is never empty.
    Update {
        task: Task,
        item: BoardItem,
        changes: FieldSet,
    },
    Create {
        task: Task,
        kind: ContentKind,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Archive { .. } => OperationKind::Archive,
            Operation::Convert { .. } => OperationKind::Convert,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Create { .. } => OperationKind::Create,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Operation::Archive { item } => &item.title,
            Operation::Convert { task, .. }
            | Operation::Update { task, .. }
            | Operation::Create { task, .. } => &task.title,
        }
    }

    /// The existing board item, if the operation targets one.
    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            Operation::Archive { item }
            | Operation::Convert { item, .. }
            | Operation::Update { item, .. } => Some(&item.id),
            Operation::Create { .. } => None,
        }
    }

    /// The document position of the task behind the operation.
    pub fn position(&self) -> Option<SourcePosition> {
        match self {
            Operation::Archive { .. } => None,
            Operation::Convert { task, .. }
            | Operation::Update { task, .. }
            | Operation::Create { task, .. } => Some(task.position),
        }
    }
}

fn join_fields(fields: &FieldSet) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create { task, kind } => {
                write!(f, "+ create {kind} '{}' [{}]", task.title, task.status)
            }
            Operation::Update { task, item, changes } => write!(
                f,
                "~ update '{}' ({}): {}",
                task.title,
                item.id,
                join_fields(changes)
            ),
            Operation::Convert { task, item, target } => write!(
                f,
                "> convert '{}' ({}): {} -> {target}",
                task.title, item.id, item.kind
            ),
            Operation::Archive { item } => write!(f, "- archive '{}' ({})", item.title, item.id),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// A task linked to an existing item without an id in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdLink {
    pub position: SourcePosition,
    pub title: String,
    pub id: ItemId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub convert: usize,
    pub archive: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl PlanSummary {
    pub fn operations(&self) -> usize {
        self.create + self.update + self.convert + self.archive
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to convert, {} to archive, {} unchanged, {} skipped",
            self.create, self.update, self.convert, self.archive, self.unchanged, self.skipped
        )
    }
}

/// An immutable, ordered set of operations for one pass.
#[derive(Debug, Clone)]
pub struct Plan {
    pub(crate) operations: Vec<Operation>,
    pub(crate) summary: PlanSummary,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) links: Vec<IdLink>,
    pub(crate) config: SyncConfig,
}

impl Plan {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn summary(&self) -> &PlanSummary {
        &self.summary
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn links(&self) -> &[IdLink] {
        &self.links
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for op in &self.operations {
            writeln!(f, "{op}")?;
        }
        write!(f, "{}", self.summary)
    }
}

// ---------------------------------------------------------------------------
// build_plan
// ---------------------------------------------------------------------------

/// Canonicalize the task's status to the board's spelling, or report it.
fn with_board_status(task: Task, board: &Board, diagnostics: &mut Vec<Diagnostic>) -> Option<Task> {
    match board.resolve_status(&task.status) {
        Some(status) => Some(Task { status, ..task }),
        None => {
            tracing::warn!(
                "{} '{}': unknown status '{}'; skipped",
                task.position,
                task.title,
                task.status
            );
            diagnostics.push(Diagnostic::for_task(
                &task,
                DiagnosticKind::UnknownStatus {
                    status: task.status.clone(),
                    known: board.statuses.clone(),
                },
            ));
            None
        }
    }
}

/// Compute the operations that converge `board` to `tasks`.
pub fn build_plan(tasks: &[Task], board: &Board, config: &SyncConfig) -> Plan {
    let matching = match_tasks(tasks, &board.items, config);
    let mut diagnostics = matching.diagnostics;
    let mut summary = PlanSummary {
        skipped: diagnostics.iter().filter(|d| d.is_error()).count(),
        ..PlanSummary::default()
    };

    let archives: Vec<Operation> = matching
        .orphans
        .into_iter()
        .map(|item| Operation::Archive { item })
        .collect();

    let mut converts = Vec::new();
    let mut updates = Vec::new();
    let mut links = Vec::new();

    for pair in matching.pairs {
        // The item stays claimed even when the task is skipped.
        let Some(task) = with_board_status(pair.task, board, &mut diagnostics) else {
            summary.skipped += 1;
            continue;
        };
        let item = pair.item;
        if pair.by == MatchedBy::Title {
            links.push(IdLink {
                position: task.position,
                title: task.title.clone(),
                id: item.id.clone(),
            });
        }

        let target = desired_kind(Some(item.kind), config);
        if target != item.kind {
            converts.push(Operation::Convert { task, item, target });
            continue;
        }
        let changes = changed_fields(&task, &item, config);
        if changes.is_empty() {
            tracing::debug!("'{}' ({}) is up to date", task.title, item.id);
            summary.unchanged += 1;
        } else {
            updates.push(Operation::Update {
                task,
                item,
                changes,
            });
        }
    }

    let mut creates = Vec::new();
    for task in matching.unmatched_tasks {
        let Some(task) = with_board_status(task, board, &mut diagnostics) else {
            summary.skipped += 1;
            continue;
        };
        creates.push(Operation::Create {
            task,
            kind: desired_kind(None, config),
        });
    }

    summary.archive = archives.len();
    summary.convert = converts.len();
    summary.update = updates.len();
    summary.create = creates.len();

    let mut operations = archives;
    operations.extend(converts);
    operations.extend(updates);
    operations.extend(creates);

    diagnostics.sort_by_key(|d| d.position);

    Plan {
        operations,
        summary,
        diagnostics,
        links,
        config: config.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Per-task data problems found while planning.

use std::fmt;

use serde::Serialize;

use boardsync_core::types::{ItemId, SourcePosition, Task};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// More than one task carries this id. All of them are skipped.
    DuplicateId { id: ItemId },
    /// The task's status is not one of the board's status options.
    UnknownStatus { status: String, known: Vec<String> },
    /// The task's id is not on the board; it will be created again.
    StaleId { id: ItemId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub title: String,
    pub position: SourcePosition,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub(crate) fn for_task(task: &Task, kind: DiagnosticKind) -> Self {
        Self {
            title: task.title.clone(),
            position: task.position,
            kind,
        }
    }

    /// Errors exclude the task from the plan; warnings do not.
    pub fn is_error(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::StaleId { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}': ", self.position, self.title)?;
        match &self.kind {
            DiagnosticKind::DuplicateId { id } => {
                write!(f, "id {id} is used by more than one task; skipped")
            }
            DiagnosticKind::UnknownStatus { status, known } => write!(
                f,
                "status '{status}' is not a board status ({}); skipped",
                known.join(", ")
            ),
            DiagnosticKind::StaleId { id } => {
                write!(f, "id {id} not found on the board; will create a new item")
            }
        }
    }
}

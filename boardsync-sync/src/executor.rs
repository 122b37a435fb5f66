//! Plan execution.
//!
//! ## Modes
//!
//! - [`Mode::Apply`]: operations run in plan order through the injected
//!   [`BoardWriter`]. Creates and converts are followed by an update for the
//!   fields the first call could not set; a failure there is
//!   [`Outcome::Partial`], never rolled back.
//! - [`Mode::Preview`]: no remote calls. Every operation yields
//!   [`Outcome::WouldApply`] carrying the state the item would end up in.
//!
//! The executor takes the [`Plan`] by value, so a plan runs at most once.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use boardsync_core::config::SyncConfig;
use boardsync_core::types::{
    BoardItem, ContentKind, Field, FieldSet, ItemId, SourcePosition, Task,
};

use crate::compare::{changed_fields, changes_for, desired_labels, normalize_description};
use crate::diagnostic::Diagnostic;
use crate::plan::{IdLink, Operation, OperationKind, Plan, PlanSummary};
use crate::remote::{BoardWriter, NewItem, RemoteError};

// ---------------------------------------------------------------------------
// Mode and cancellation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Apply,
    Preview,
}

/// Shared flag checked between operations.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    WouldApply,
    /// The main call succeeded; the follow-up field update did not.
    Partial { error: String },
    Failed { error: String },
    Cancelled,
}

impl Outcome {
    fn partial(err: &RemoteError) -> Self {
        Outcome::Partial {
            error: err.to_string(),
        }
    }

    fn failed(err: &RemoteError) -> Self {
        Outcome::Failed {
            error: err.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::WouldApply => "would apply",
            Outcome::Partial { .. } => "partial",
            Outcome::Failed { .. } => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Partial { error } | Outcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// The remote state an operation leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemState {
    pub kind: ContentKind,
    pub title: String,
    pub status: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,
}

impl From<&BoardItem> for ItemState {
    fn from(item: &BoardItem) -> Self {
        Self {
            kind: item.kind,
            title: item.title.clone(),
            status: item.status.clone(),
            description: item.description.clone(),
            due: item.due,
            assignee: item.assignee.clone(),
            labels: item.labels.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub kind: OperationKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// Id assigned by a create or convert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
    /// Fields written (or to be written).
    pub fields: FieldSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<ItemState>,
    pub outcome: Outcome,
}

impl OperationResult {
    fn for_operation(op: &Operation, outcome: Outcome) -> Self {
        Self {
            kind: op.kind(),
            title: op.title().to_string(),
            item_id: op.item_id().cloned(),
            new_id: None,
            position: op.position(),
            fields: FieldSet::new(),
            after: None,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub mode: Mode,
    pub summary: PlanSummary,
    pub results: Vec<OperationResult>,
    pub diagnostics: Vec<Diagnostic>,
    pub links: Vec<IdLink>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExecutionReport {
    /// Ids to record in the document: title-matched links plus ids assigned
    /// by successful creates and converts.
    pub fn id_assignments(&self) -> Vec<IdLink> {
        let mut out = self.links.clone();
        for result in &self.results {
            let landed = matches!(result.outcome, Outcome::Applied | Outcome::Partial { .. });
            if let (true, Some(id), Some(position)) = (landed, &result.new_id, result.position) {
                out.push(IdLink {
                    position,
                    title: result.title.clone(),
                    id: id.clone(),
                });
            }
        }
        out.sort_by_key(|link| link.position);
        out
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Applied | Outcome::WouldApply))
    }

    pub fn partial(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Partial { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    /// No operation failed, stopped half-way or was cancelled.
    pub fn is_success(&self) -> bool {
        self.partial() == 0 && self.failed() == 0 && self.cancelled() == 0
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor<'w, W: BoardWriter + ?Sized> {
    writer: &'w mut W,
    mode: Mode,
    cancel: CancelFlag,
}

impl<'w, W: BoardWriter + ?Sized> Executor<'w, W> {
    pub fn new(writer: &'w mut W, mode: Mode) -> Self {
        Self {
            writer,
            mode,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn run(mut self, plan: Plan) -> ExecutionReport {
        let started_at = Utc::now();
        let Plan {
            operations,
            summary,
            diagnostics,
            links,
            config,
        } = plan;

        let mut results = Vec::with_capacity(operations.len());
        let mut stopped = false;
        for op in operations {
            if !stopped && self.cancel.is_cancelled() {
                tracing::warn!("cancelled; remaining operations skipped");
                stopped = true;
            }
            let result = if stopped {
                OperationResult::for_operation(&op, Outcome::Cancelled)
            } else {
                match self.mode {
                    Mode::Preview => preview(op, &config),
                    Mode::Apply => self.apply(op, &config),
                }
            };
            results.push(result);
        }

        ExecutionReport {
            mode: self.mode,
            summary,
            results,
            diagnostics,
            links,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn apply(&mut self, op: Operation, config: &SyncConfig) -> OperationResult {
        let mut result = OperationResult::for_operation(&op, Outcome::Applied);
        match op {
            Operation::Archive { item } => {
                if let Err(e) = self.writer.archive_item(&item.id) {
                    tracing::warn!("archive of {} failed: {e}", item.id);
                    result.outcome = Outcome::failed(&e);
                } else {
                    tracing::info!("archived '{}' ({})", item.title, item.id);
                }
            }
            Operation::Update {
                task,
                item,
                changes,
            } => {
                let writes = changes_for(&changes, &task, config);
                match self.writer.update_item(&item.id, &writes) {
                    Ok(()) => {
                        let mut after = item;
                        writes.iter().for_each(|w| w.apply_to(&mut after));
                        tracing::info!("updated '{}' ({})", task.title, after.id);
                        result.after = Some(ItemState::from(&after));
                    }
                    Err(e) => {
                        tracing::warn!("update of {} failed: {e}", item.id);
                        result.outcome = Outcome::failed(&e);
                    }
                }
                result.fields = changes;
            }
            Operation::Convert { task, item, target } => {
                match self.writer.convert_item(&item.id, target) {
                    Ok(converted) => {
                        tracing::info!("converted '{}' ({}) to {target}", task.title, item.id);
                        result.new_id = Some(converted.id.clone());
                        self.follow_up(&task, converted, config, &mut result);
                    }
                    Err(e) => {
                        tracing::warn!("convert of {} failed: {e}", item.id);
                        result.outcome = Outcome::failed(&e);
                    }
                }
            }
            Operation::Create { task, kind } => {
                let new = NewItem {
                    kind,
                    title: task.title.clone(),
                    description: normalize_description(&task.description),
                    status: task.status.clone(),
                };
                match self.writer.create_item(&new) {
                    Ok(created) => {
                        tracing::info!("created {kind} '{}' as {}", task.title, created.id);
                        result.new_id = Some(created.id.clone());
                        self.follow_up(&task, created, config, &mut result);
                    }
                    Err(e) => {
                        tracing::warn!("create of '{}' failed: {e}", task.title);
                        result.outcome = Outcome::failed(&e);
                    }
                }
            }
        }
        result
    }

    /// Write whatever the create/convert call left different from `task`.
    fn follow_up(
        &mut self,
        task: &Task,
        mut item: BoardItem,
        config: &SyncConfig,
        result: &mut OperationResult,
    ) {
        let fields = changed_fields(task, &item, config);
        if !fields.is_empty() {
            let writes = changes_for(&fields, task, config);
            match self.writer.update_item(&item.id, &writes) {
                Ok(()) => writes.iter().for_each(|w| w.apply_to(&mut item)),
                Err(e) => {
                    tracing::warn!("follow-up update of {} failed: {e}", item.id);
                    result.outcome = Outcome::partial(&e);
                }
            }
        }
        result.fields = fields;
        result.after = Some(ItemState::from(&item));
    }
}

/// The result a real run would produce, without touching the board.
fn preview(op: Operation, config: &SyncConfig) -> OperationResult {
    tracing::info!("[dry-run] would {op}");
    let mut result = OperationResult::for_operation(&op, Outcome::WouldApply);
    match op {
        Operation::Archive { .. } => {}
        Operation::Update {
            task,
            item,
            changes,
        } => {
            let mut after = item;
            for write in changes_for(&changes, &task, config) {
                write.apply_to(&mut after);
            }
            result.after = Some(ItemState::from(&after));
            result.fields = changes;
        }
        Operation::Convert { task, item, target } => {
            let mut after = BoardItem {
                kind: target,
                ..item
            };
            let fields = changed_fields(&task, &after, config);
            for write in changes_for(&fields, &task, config) {
                write.apply_to(&mut after);
            }
            result.after = Some(ItemState::from(&after));
            result.fields = fields;
        }
        Operation::Create { task, kind } => {
            let issue = kind == ContentKind::Issue;
            result.fields = kind
                .writable_fields()
                .iter()
                .copied()
                .filter(|f| *f != Field::Due || task.due.is_some())
                .collect();
            result.after = Some(ItemState {
                kind,
                title: task.title.clone(),
                status: task.status.clone(),
                description: normalize_description(&task.description),
                due: task.due,
                assignee: task.assignee.clone().filter(|_| issue),
                labels: if issue {
                    desired_labels(&task, config)
                } else {
                    BTreeSet::new()
                },
            });
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Collaborator interfaces for the remote board.
//!
//! [`BoardReader`] produces the board model, [`BoardWriter`] applies
//! mutations. Both are implemented by the GitHub client and by
//! [`SnapshotBoard`](crate::SnapshotBoard).

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardsync_core::types::{Board, BoardItem, ContentKind, Field, ItemId};

/// Typed failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("authorization failed: {0}")]
    Unauthorized(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("item {0} not found on the board")]
    NotFound(ItemId),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("remote API error: {0}")]
    Api(String),
}

/// A single field write, carrying the desired value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum FieldChange {
    Title(String),
    Description(String),
    Status(String),
    /// `None` clears the date.
    Due(Option<NaiveDate>),
    Assignee(Option<String>),
    Labels(BTreeSet<String>),
}

impl FieldChange {
    pub fn field(&self) -> Field {
        match self {
            FieldChange::Title(_) => Field::Title,
            FieldChange::Description(_) => Field::Description,
            FieldChange::Status(_) => Field::Status,
            FieldChange::Due(_) => Field::Due,
            FieldChange::Assignee(_) => Field::Assignee,
            FieldChange::Labels(_) => Field::Labels,
        }
    }

    /// Apply this change to a local copy of an item.
    pub fn apply_to(&self, item: &mut BoardItem) {
        match self {
            FieldChange::Title(v) => item.title = v.clone(),
            FieldChange::Description(v) => item.description = v.clone(),
            FieldChange::Status(v) => item.status = v.clone(),
            FieldChange::Due(v) => item.due = *v,
            FieldChange::Assignee(v) => item.assignee = v.clone(),
            FieldChange::Labels(v) => item.labels = v.clone(),
        }
    }
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldChange::Title(v) => write!(f, "title={v:?}"),
            FieldChange::Description(v) => write!(f, "description=({} chars)", v.chars().count()),
            FieldChange::Status(v) => write!(f, "status={v:?}"),
            FieldChange::Due(Some(v)) => write!(f, "due={v}"),
            FieldChange::Due(None) => write!(f, "due=(none)"),
            FieldChange::Assignee(Some(v)) => write!(f, "assignee=@{v}"),
            FieldChange::Assignee(None) => write!(f, "assignee=(none)"),
            FieldChange::Labels(v) => {
                let joined: Vec<&str> = v.iter().map(String::as_str).collect();
                write!(f, "labels=[{}]", joined.join(", "))
            }
        }
    }
}

/// What the creation call receives. Assignee and labels are never part of
/// it; they follow as a separate update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub kind: ContentKind,
    pub title: String,
    pub description: String,
    pub status: String,
}

/// Fetch collaborator.
pub trait BoardReader {
    /// Return the full current board: status options plus every item.
    fn fetch_board(&mut self) -> Result<Board, RemoteError>;
}

/// Mutation collaborator consumed by the executor.
pub trait BoardWriter {
    /// Create an item; returns its state as the board now holds it.
    fn create_item(&mut self, item: &NewItem) -> Result<BoardItem, RemoteError>;

    /// Convert an item to another content kind; returns the new state.
    fn convert_item(&mut self, id: &ItemId, target: ContentKind) -> Result<BoardItem, RemoteError>;

    fn update_item(&mut self, id: &ItemId, changes: &[FieldChange]) -> Result<(), RemoteError>;

    fn archive_item(&mut self, id: &ItemId) -> Result<(), RemoteError>;
}

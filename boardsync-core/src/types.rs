//! Domain types shared by the parser, the sync engine and the remote clients.
//!
//! Two models meet here: the local [`Task`] list parsed from the document and
//! the remote [`Board`] fetched from the tracker. Neither carries behaviour
//! beyond small accessors; reconciliation lives in `boardsync-sync`.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier of a board item, assigned by the remote board.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Location of a task heading inside the source document (1-based line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePosition(pub usize);

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Content kinds and the capability table
// ---------------------------------------------------------------------------

/// A board item field the engine knows how to compare and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Description,
    Status,
    Due,
    Assignee,
    Labels,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Title => write!(f, "title"),
            Field::Description => write!(f, "description"),
            Field::Status => write!(f, "status"),
            Field::Due => write!(f, "due"),
            Field::Assignee => write!(f, "assignee"),
            Field::Labels => write!(f, "labels"),
        }
    }
}

/// Ordered set of fields, used for "what changed" results.
pub type FieldSet = BTreeSet<Field>;

/// Sub-type of a board item. Determines which fields are remotely writable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Draft,
    Issue,
    PullRequest,
}

// Status and Due are project fields, writable whatever the content is.
const DRAFT_FIELDS: &[Field] = &[Field::Title, Field::Description, Field::Status, Field::Due];
const ISSUE_FIELDS: &[Field] = &[
    Field::Title,
    Field::Description,
    Field::Status,
    Field::Due,
    Field::Assignee,
    Field::Labels,
];
const PULL_REQUEST_FIELDS: &[Field] = &[Field::Status, Field::Due];

impl ContentKind {
    /// Capability table: the fields this kind can have written remotely.
    pub fn writable_fields(self) -> &'static [Field] {
        match self {
            ContentKind::Draft => DRAFT_FIELDS,
            ContentKind::Issue => ISSUE_FIELDS,
            ContentKind::PullRequest => PULL_REQUEST_FIELDS,
        }
    }

    pub fn can_write(self, field: Field) -> bool {
        self.writable_fields().contains(&field)
    }

    /// Whether an item of this kind may be converted into `target`.
    pub fn converts_to(self, target: ContentKind) -> bool {
        matches!((self, target), (ContentKind::Draft, ContentKind::Issue))
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Draft => write!(f, "draft"),
            ContentKind::Issue => write!(f, "issue"),
            ContentKind::PullRequest => write!(f, "pull request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// One task parsed from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    pub position: SourcePosition,
}

impl Task {
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: status.into(),
            id: None,
            assignee: None,
            labels: BTreeSet::new(),
            description: String::new(),
            due: None,
            position: SourcePosition(0),
        }
    }

    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn at(mut self, line: usize) -> Self {
        self.position = SourcePosition(line);
        self
    }
}

// ---------------------------------------------------------------------------
// Board model
// ---------------------------------------------------------------------------

/// One item on the remote board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    pub id: ItemId,
    /// Id of the underlying draft/issue/pull request; only remote clients use it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(default)]
    pub kind: ContentKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub scope_markers: BTreeSet<String>,
}

impl BoardItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content_id: None,
            kind: ContentKind::Draft,
            title: title.into(),
            description: String::new(),
            status: status.into(),
            due: None,
            assignee: None,
            labels: BTreeSet::new(),
            scope_markers: BTreeSet::new(),
        }
    }

    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope_marker(mut self, marker: impl Into<String>) -> Self {
        self.scope_markers.insert(marker.into());
        self
    }

    /// Label names are case-insensitive on GitHub, so markers are too.
    pub fn has_scope_marker(&self, marker: &str) -> bool {
        let wanted = marker.to_lowercase();
        self.scope_markers.iter().any(|m| m.to_lowercase() == wanted)
    }
}

/// Full fetched state of a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Board {
    /// Configured status options, in board order. Empty means unconstrained.
    #[serde(default)]
    pub statuses: Vec<String>,
    #[serde(default)]
    pub items: Vec<BoardItem>,
}

impl Board {
    /// Resolve a status name to the board's spelling of it.
    ///
    /// Exact match wins; otherwise the first case-insensitive match. An
    /// unconstrained board accepts any status as-is.
    pub fn resolve_status(&self, status: &str) -> Option<String> {
        let wanted = status.trim();
        if self.statuses.is_empty() {
            return Some(wanted.to_string());
        }
        if let Some(exact) = self.statuses.iter().find(|s| s.as_str() == wanted) {
            return Some(exact.clone());
        }
        self.statuses
            .iter()
            .find(|s| s.to_lowercase() == wanted.to_lowercase())
            .cloned()
    }

    pub fn find(&self, id: &ItemId) -> Option<&BoardItem> {
        self.items.iter().find(|item| &item.id == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(ItemId::from("PVTI_1").to_string(), "PVTI_1");
        assert_eq!(SourcePosition(12).to_string(), "line 12");
    }

    #[test]
    fn capability_table() {
        assert!(ContentKind::Draft.can_write(Field::Title));
        assert!(ContentKind::Draft.can_write(Field::Status));
        assert!(!ContentKind::Draft.can_write(Field::Assignee));
        assert!(!ContentKind::Draft.can_write(Field::Labels));
        assert!(ContentKind::Issue.can_write(Field::Labels));
        assert_eq!(
            ContentKind::PullRequest.writable_fields(),
            &[Field::Status, Field::Due]
        );
        for kind in [ContentKind::Draft, ContentKind::Issue, ContentKind::PullRequest] {
            assert!(kind.can_write(Field::Due), "{kind} should write due dates");
        }
    }

    #[test]
    fn scope_markers_ignore_case() {
        let item = BoardItem::new("X", "T", "Todo").with_scope_marker("Repo-A");
        assert!(item.has_scope_marker("repo-a"));
        assert!(item.has_scope_marker("REPO-A"));
        assert!(!item.has_scope_marker("repo-b"));
    }

    #[test]
    fn only_drafts_convert_to_issues() {
        assert!(ContentKind::Draft.converts_to(ContentKind::Issue));
        assert!(!ContentKind::PullRequest.converts_to(ContentKind::Issue));
        assert!(!ContentKind::Issue.converts_to(ContentKind::Draft));
    }

    #[test]
    fn resolve_status_prefers_exact_then_case_insensitive() {
        let board = Board {
            statuses: vec!["Todo".into(), "In progress".into(), "Done".into()],
            items: vec![],
        };
        assert_eq!(board.resolve_status("Done").as_deref(), Some("Done"));
        assert_eq!(
            board.resolve_status("In Progress").as_deref(),
            Some("In progress")
        );
        assert_eq!(board.resolve_status("Blocked"), None);
    }

    #[test]
    fn unconstrained_board_accepts_any_status() {
        let board = Board::default();
        assert_eq!(board.resolve_status(" Later ").as_deref(), Some("Later"));
    }

    #[test]
    fn board_item_serde_defaults() {
        let item: BoardItem =
            serde_json::from_str(r#"{"id":"X","title":"T"}"#).expect("deserialize");
        assert_eq!(item.kind, ContentKind::Draft);
        assert!(item.labels.is_empty());
        assert!(item.assignee.is_none());
    }
}

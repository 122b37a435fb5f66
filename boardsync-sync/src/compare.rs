//! Field comparison between a task and its matched board item.
//!
//! Only fields the item's kind can write are compared; see
//! [`ContentKind::writable_fields`]. Comparing a field that can never be
//! written would report a difference on every run.
//!
//! Labels and logins compare without case: GitHub resolves both
//! case-insensitively and hands back its own spelling on the next fetch.

use std::collections::BTreeSet;

use boardsync_core::config::SyncConfig;
use boardsync_core::types::{BoardItem, ContentKind, Field, FieldSet, Task};

use crate::remote::FieldChange;

/// Normalize description text for comparison.
///
/// CRLF becomes LF, trailing whitespace is stripped from every line and
/// leading/trailing blank lines are dropped. Internal blank lines stay.
pub fn normalize_description(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    let lines: Vec<&str> = unified.lines().map(str::trim_end).collect();
    let start = lines.iter().position(|l| !l.is_empty());
    let end = lines.iter().rposition(|l| !l.is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].join("\n"),
        _ => String::new(),
    }
}

/// The kind an item for `current` (or a new task, `None`) should end up as.
///
/// A configured target repository turns drafts and new tasks into issues.
/// Kinds that cannot be converted are left alone.
pub fn desired_kind(current: Option<ContentKind>, config: &SyncConfig) -> ContentKind {
    let target = if config.target_repo.is_some() {
        ContentKind::Issue
    } else {
        ContentKind::Draft
    };
    match current {
        None => target,
        Some(kind) if kind.converts_to(target) => target,
        Some(kind) => kind,
    }
}

/// Labels to write for `task`: its own labels plus the scope marker.
///
/// Comparison runs against this set too, so a marker already on the item is
/// never a difference and a missing one is written.
pub fn desired_labels(task: &Task, config: &SyncConfig) -> BTreeSet<String> {
    let mut labels = task.labels.clone();
    if let Some(marker) = &config.scope_marker {
        labels.insert(marker.clone());
    }
    labels
}

fn fold(names: &BTreeSet<String>) -> BTreeSet<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
}

fn same_login(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        (None, None) => true,
        _ => false,
    }
}

fn differs(field: Field, task: &Task, item: &BoardItem, config: &SyncConfig) -> bool {
    match field {
        Field::Title => task.title != item.title,
        Field::Description => {
            normalize_description(&task.description) != normalize_description(&item.description)
        }
        Field::Status => task.status.trim().to_lowercase() != item.status.trim().to_lowercase(),
        // An unset due date leaves the board's date alone.
        Field::Due => task.due.is_some() && task.due != item.due,
        Field::Assignee => !same_login(task.assignee.as_deref(), item.assignee.as_deref()),
        Field::Labels => fold(&desired_labels(task, config)) != fold(&item.labels),
    }
}

/// Fields of `item` that differ from `task` and that `item.kind` can write.
pub fn changed_fields(task: &Task, item: &BoardItem, config: &SyncConfig) -> FieldSet {
    item.kind
        .writable_fields()
        .iter()
        .copied()
        .filter(|field| differs(*field, task, item, config))
        .collect()
}

/// The write that brings `field` in line with `task`.
pub fn change_for(field: Field, task: &Task, config: &SyncConfig) -> FieldChange {
    match field {
        Field::Title => FieldChange::Title(task.title.clone()),
        Field::Description => FieldChange::Description(normalize_description(&task.description)),
        Field::Status => FieldChange::Status(task.status.clone()),
        Field::Due => FieldChange::Due(task.due),
        Field::Assignee => FieldChange::Assignee(task.assignee.clone()),
        Field::Labels => FieldChange::Labels(desired_labels(task, config)),
    }
}

/// [`change_for`] over a whole field set, in field order.
pub fn changes_for(fields: &FieldSet, task: &Task, config: &SyncConfig) -> Vec<FieldChange> {
    fields
        .iter()
        .map(|field| change_for(*field, task, config))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use boardsync_core::config::RepoRef;
    use chrono::NaiveDate;

    use super::*;

    fn fields(list: &[Field]) -> FieldSet {
        list.iter().copied().collect()
    }

    fn repo() -> RepoRef {
        RepoRef {
            owner: "acme".into(),
            name: "api".into(),
        }
    }

    #[test]
    fn identical_pair_has_no_changes() {
        let task = Task::new("T", "Todo").with_description("d");
        let item = BoardItem::new("X", "T", "Todo").with_description("d");
        assert!(changed_fields(&task, &item, &SyncConfig::default()).is_empty());
    }

    #[test]
    fn status_compares_case_insensitively() {
        let task = Task::new("T", "In Progress");
        let item = BoardItem::new("X", "T", "in progress");
        assert!(changed_fields(&task, &item, &SyncConfig::default()).is_empty());
    }

    #[test]
    fn description_normalization() {
        assert_eq!(normalize_description("\n\n  a  \r\n\r\nb\t\n\n"), "  a\n\nb");
        assert_eq!(normalize_description("   \n \n"), "");
        let task = Task::new("T", "Todo").with_description("hello   \n\nworld");
        let item = BoardItem::new("X", "T", "Todo").with_description("hello\n\nworld\n");
        assert!(changed_fields(&task, &item, &SyncConfig::default()).is_empty());
    }

    #[test]
    fn internal_blank_lines_are_significant() {
        let task = Task::new("T", "Todo").with_description("a\n\nb");
        let item = BoardItem::new("X", "T", "Todo").with_description("a\nb");
        assert_eq!(
            changed_fields(&task, &item, &SyncConfig::default()),
            fields(&[Field::Description])
        );
    }

    #[test]
    fn draft_ignores_assignee_and_labels() {
        let task = Task::new("T", "Todo")
            .with_assignee("alice")
            .with_labels(["bug"]);
        let item = BoardItem::new("X", "T", "Todo");
        assert!(changed_fields(&task, &item, &SyncConfig::default()).is_empty());

        let renamed = Task::new("T2", "Todo").with_assignee("alice");
        assert_eq!(
            changed_fields(&renamed, &item, &SyncConfig::default()),
            fields(&[Field::Title])
        );
    }

    #[test]
    fn issue_compares_assignee_and_labels_as_sets() {
        let item = BoardItem::new("X", "T", "Todo")
            .with_kind(ContentKind::Issue)
            .with_assignee("bob")
            .with_labels(["bug", "docs"]);
        let same = Task::new("T", "Todo")
            .with_assignee("bob")
            .with_labels(["docs", "bug"]);
        assert!(changed_fields(&same, &item, &SyncConfig::default()).is_empty());

        let other = Task::new("T", "Todo").with_assignee("alice");
        assert_eq!(
            changed_fields(&other, &item, &SyncConfig::default()),
            fields(&[Field::Assignee, Field::Labels])
        );
    }

    #[test]
    fn pull_request_only_compares_project_fields() {
        let item = BoardItem::new("X", "Old", "Todo").with_kind(ContentKind::PullRequest);
        let task = Task::new("New", "Done").with_description("changed");
        assert_eq!(
            changed_fields(&task, &item, &SyncConfig::default()),
            fields(&[Field::Status])
        );
    }

    #[test]
    fn labels_and_assignee_ignore_case() {
        let item = BoardItem::new("X", "T", "Todo")
            .with_kind(ContentKind::Issue)
            .with_assignee("Alice")
            .with_labels(["Bug", "Repo-A"]);
        let task = Task::new("T", "Todo")
            .with_assignee("alice")
            .with_labels(["bug"]);
        assert!(changed_fields(&task, &item, &SyncConfig::scoped("repo-a")).is_empty());

        let renamed = Task::new("T", "Todo").with_assignee("bob").with_labels(["bug"]);
        assert_eq!(
            changed_fields(&renamed, &item, &SyncConfig::scoped("repo-a")),
            fields(&[Field::Assignee])
        );
    }

    #[test]
    fn due_date_compared_only_when_set() {
        let march = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let april = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let item = BoardItem::new("X", "T", "Todo").with_due(march);

        let undated = Task::new("T", "Todo");
        assert!(changed_fields(&undated, &item, &SyncConfig::default()).is_empty());

        let same = Task::new("T", "Todo").with_due(march);
        assert!(changed_fields(&same, &item, &SyncConfig::default()).is_empty());

        let moved = Task::new("T", "Todo").with_due(april);
        assert_eq!(
            changed_fields(&moved, &item, &SyncConfig::default()),
            fields(&[Field::Due])
        );
        assert_eq!(
            change_for(Field::Due, &moved, &SyncConfig::default()),
            FieldChange::Due(Some(april))
        );

        let pr = BoardItem::new("P", "T", "Todo").with_kind(ContentKind::PullRequest);
        assert_eq!(
            changed_fields(&moved, &pr, &SyncConfig::default()),
            fields(&[Field::Due])
        );
    }

    #[test]
    fn scope_marker_is_owned_by_the_engine() {
        let config = SyncConfig::scoped("repo-a");
        let item = BoardItem::new("X", "T", "Todo")
            .with_kind(ContentKind::Issue)
            .with_labels(["bug", "repo-a"]);
        let task = Task::new("T", "Todo").with_labels(["bug"]);
        assert!(changed_fields(&task, &item, &config).is_empty());

        let unmarked = BoardItem::new("Y", "T", "Todo")
            .with_kind(ContentKind::Issue)
            .with_labels(["bug"]);
        assert_eq!(
            changed_fields(&task, &unmarked, &config),
            fields(&[Field::Labels])
        );

        let expected: BTreeSet<String> = ["bug", "repo-a"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            change_for(Field::Labels, &task, &config),
            FieldChange::Labels(expected)
        );
    }

    #[test]
    fn desired_kind_rules() {
        let plain = SyncConfig::default();
        let with_repo = SyncConfig::default().with_target_repo(repo());
        assert_eq!(desired_kind(None, &plain), ContentKind::Draft);
        assert_eq!(desired_kind(None, &with_repo), ContentKind::Issue);
        assert_eq!(desired_kind(Some(ContentKind::Draft), &plain), ContentKind::Draft);
        assert_eq!(desired_kind(Some(ContentKind::Draft), &with_repo), ContentKind::Issue);
        assert_eq!(desired_kind(Some(ContentKind::Issue), &plain), ContentKind::Issue);
        assert_eq!(
            desired_kind(Some(ContentKind::PullRequest), &with_repo),
            ContentKind::PullRequest
        );
    }
}

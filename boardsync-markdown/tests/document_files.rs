//! File-level parse / writeback / prune tests.

use assert_fs::prelude::*;
use boardsync_core::types::{ItemId, SourcePosition};
use boardsync_markdown::{
    normalize_status, parse, parse_file, remove_done_tasks_file, writeback_file, DocumentError,
    IdAssignment,
};
use predicates::prelude::*;
use rstest::rstest;

const TASKS: &str = "\
# Tasks

## Todo

### Write docs
Explain setup.

### Fix bug
<!-- id: PVTI_old -->

## Done

### Ship v1
<!-- id: PVTI_9 -->
";

#[test]
fn writeback_then_reparse_links_tasks() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("TASKS.md");
    file.write_str(TASKS).expect("write");

    let doc = parse_file(file.path()).expect("parse");
    let assignments: Vec<IdAssignment> = doc
        .tasks
        .iter()
        .take(2)
        .enumerate()
        .map(|(n, task)| IdAssignment {
            position: task.position,
            id: ItemId::from(format!("PVTI_new{n}")),
        })
        .collect();

    assert!(writeback_file(file.path(), &assignments).expect("writeback"));
    file.assert(predicate::str::contains("<!-- id: PVTI_new0 -->"));
    file.assert(predicate::str::contains("<!-- id: PVTI_new1 -->"));
    file.assert(predicate::str::contains("PVTI_old").not());
    dir.child("TASKS.md.boardsync.tmp")
        .assert(predicate::path::missing());

    let reparsed = parse_file(file.path()).expect("reparse");
    let ids: Vec<_> = reparsed
        .tasks
        .iter()
        .map(|t| t.id.as_ref().map(ItemId::as_str))
        .collect();
    assert_eq!(ids, [Some("PVTI_new0"), Some("PVTI_new1"), Some("PVTI_9")]);
    assert_eq!(reparsed.tasks[0].description, "Explain setup.");

    // Same assignments again change nothing.
    let positions: Vec<IdAssignment> = reparsed
        .tasks
        .iter()
        .take(2)
        .map(|t| IdAssignment {
            position: t.position,
            id: t.id.clone().expect("linked"),
        })
        .collect();
    assert!(!writeback_file(file.path(), &positions).expect("second writeback"));
}

#[test]
fn prune_file_removes_done_section_tasks() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child("TASKS.md");
    file.write_str(TASKS).expect("write");

    assert!(remove_done_tasks_file(file.path()).expect("prune"));
    file.assert(predicate::str::contains("## Done"));
    file.assert(predicate::str::contains("Ship v1").not());
    assert!(!remove_done_tasks_file(file.path()).expect("second prune"));

    let doc = parse_file(file.path()).expect("parse");
    assert_eq!(doc.tasks.len(), 2);
}

#[test]
fn missing_file_reports_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("nope.md");
    let err = parse_file(&path).unwrap_err();
    assert!(matches!(err, DocumentError::Io { .. }));
    assert!(err.to_string().contains("nope.md"));

    let err = writeback_file(
        &path,
        &[IdAssignment {
            position: SourcePosition(1),
            id: ItemId::from("X"),
        }],
    )
    .unwrap_err();
    assert!(matches!(err, DocumentError::Io { .. }));
}

#[rstest]
#[case("Todo", "Todo")]
#[case("to do", "Todo")]
#[case("TO-DO", "Todo")]
#[case("In Progress", "In Progress")]
#[case("in-progress", "In Progress")]
#[case("InProgress", "In Progress")]
#[case("done", "Done")]
#[case("Closed", "Done")]
#[case("  Review  ", "Review")]
fn status_headings_normalize(#[case] raw: &str, #[case] expected: &str) {
    assert_eq!(normalize_status(raw), expected);
    let doc = parse(&format!("## {raw}\n### Task\n"));
    assert_eq!(doc.tasks[0].status, expected);
}

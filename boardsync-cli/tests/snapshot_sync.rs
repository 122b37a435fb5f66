//! End-to-end runs of the `boardsync` binary against a local board file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const TASKS: &str = "\
# Tasks

## Todo
### Write docs
- **Labels:** docs
- **Due:** 2024-07-01
Explain the sync flow.

## In Progress
### Fix login redirect
- **Assignee:** @alice

## Done
### Ship v1
";

fn boardsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("boardsync"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("GITHUB_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

struct Workspace {
    home: TempDir,
    dir: TempDir,
}

impl Workspace {
    fn new(tasks: &str, board: Option<&str>) -> Self {
        let ws = Self {
            home: TempDir::new().expect("home"),
            dir: TempDir::new().expect("workspace"),
        };
        fs::write(ws.tasks(), tasks).expect("write tasks");
        if let Some(board) = board {
            fs::write(ws.board(), board).expect("write board");
        }
        ws
    }

    fn tasks(&self) -> PathBuf {
        self.dir.path().join("TASKS.md")
    }

    fn board(&self) -> PathBuf {
        self.dir.path().join("board.json")
    }

    fn cmd(&self, subcommand: &str) -> Command {
        let mut cmd = boardsync_cmd(self.home.path());
        cmd.arg(subcommand).arg(self.tasks());
        cmd
    }

    fn sync(&self) -> Command {
        let mut cmd = self.cmd("sync");
        cmd.arg("--board-file").arg(self.board());
        cmd
    }

    fn board_json(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.board()).expect("read board");
        serde_json::from_str(&raw).expect("board json")
    }
}

const BOARD: &str = r#"{ "statuses": ["Todo", "In Progress", "Done"], "items": [] }"#;

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

#[test]
fn dry_run_leaves_board_and_document_untouched() {
    let ws = Workspace::new(TASKS, Some(BOARD));

    ws.sync()
        .arg("--dry-run")
        .arg("--writeback")
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("Write docs"));

    assert_eq!(fs::read_to_string(ws.board()).unwrap(), BOARD);
    assert_eq!(fs::read_to_string(ws.tasks()).unwrap(), TASKS);
}

#[test]
fn apply_with_writeback_links_every_task() {
    let ws = Workspace::new(TASKS, Some(BOARD));

    ws.sync().arg("--writeback").assert().success();

    let board = ws.board_json();
    let items = board["items"].as_array().expect("items");
    assert_eq!(items.len(), 3);
    let titles: Vec<&str> = items.iter().filter_map(|i| i["title"].as_str()).collect();
    assert!(titles.contains(&"Fix login redirect"));
    let docs = items.iter().find(|i| i["title"] == "Write docs").expect("docs item");
    assert_eq!(docs["due"], "2024-07-01");

    let doc = fs::read_to_string(ws.tasks()).unwrap();
    assert_eq!(doc.matches("<!-- id: ITEM_").count(), 3, "doc:\n{doc}");
    for item in items {
        let id = item["id"].as_str().expect("id");
        assert!(doc.contains(&format!("<!-- id: {id} -->")), "missing {id}");
    }
}

#[test]
fn second_sync_after_writeback_is_a_no_op() {
    let ws = Workspace::new(TASKS, Some(BOARD));
    ws.sync().arg("--writeback").assert().success();
    let board_after_first = fs::read_to_string(ws.board()).unwrap();

    ws.sync()
        .assert()
        .success()
        .stdout(contains("board is up to date"));

    assert_eq!(fs::read_to_string(ws.board()).unwrap(), board_after_first);
}

#[test]
fn removed_task_is_archived_on_next_sync() {
    let ws = Workspace::new(TASKS, Some(BOARD));
    ws.sync().arg("--writeback").assert().success();

    let doc = fs::read_to_string(ws.tasks()).unwrap();
    let start = doc.find("## Done").expect("done section");
    fs::write(ws.tasks(), &doc[..start]).unwrap();

    ws.sync().assert().success().stdout(contains("archive"));

    let board = ws.board_json();
    assert_eq!(board["items"].as_array().unwrap().len(), 2);
    let archived = board["archived"].as_array().expect("archived");
    assert_eq!(archived[0]["title"], "Ship v1");
}

#[test]
fn unknown_status_is_reported_and_skipped() {
    let ws = Workspace::new("## Blocked\n### Waiting on vendor\n", Some(BOARD));

    ws.sync()
        .assert()
        .success()
        .stderr(contains("status 'Blocked' is not a board status"));

    assert!(ws.board_json()["items"].as_array().unwrap().is_empty());
}

#[test]
fn json_report_lists_outcomes() {
    let ws = Workspace::new(TASKS, Some(BOARD));
    let out_file = ws.dir.path().join("report.json");

    let output = ws
        .sync()
        .arg("--json")
        .arg("--output-json")
        .arg(&out_file)
        .output()
        .expect("run sync --json");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stdout json");
    assert_eq!(report["mode"], "apply");
    let results = report["results"].as_array().expect("results");
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r["outcome"]["status"] == "applied"));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_file).unwrap()).unwrap();
    assert_eq!(written["summary"], report["summary"]);
}

#[test]
fn prune_done_runs_after_successful_apply() {
    let ws = Workspace::new(TASKS, Some(BOARD));

    ws.sync().arg("--prune-done").assert().success();

    let doc = fs::read_to_string(ws.tasks()).unwrap();
    assert!(!doc.contains("Ship v1"));
    assert!(doc.contains("Write docs"));
}

#[test]
fn missing_board_is_an_error() {
    let ws = Workspace::new(TASKS, None);

    ws.cmd("sync")
        .assert()
        .failure()
        .stderr(contains("no board given"));
}

// ---------------------------------------------------------------------------
// plan / check / prune
// ---------------------------------------------------------------------------

#[test]
fn plan_prints_operations_and_summary() {
    let ws = Workspace::new(TASKS, Some(BOARD));

    ws.cmd("plan")
        .arg("--board-file")
        .arg(ws.board())
        .assert()
        .success()
        .stdout(contains("+ create draft 'Write docs' [Todo]"))
        .stdout(contains("3 to create"));

    assert_eq!(fs::read_to_string(ws.board()).unwrap(), BOARD);
}

#[test]
fn check_groups_tasks_by_status() {
    let ws = Workspace::new(TASKS, None);

    ws.cmd("check")
        .assert()
        .success()
        .stdout(contains("3 tasks"))
        .stdout(contains("IN PROGRESS"))
        .stdout(contains("2024-07-01"))
        .stdout(contains("@alice"));
}

#[test]
fn check_json_reports_headings_outside_sections() {
    let ws = Workspace::new("### Orphan heading\n## Todo\n### Real\n", None);

    let output = ws.cmd("check").arg("--json").output().expect("run check");
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tasks = parsed["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["status"], "Todo");
    assert_eq!(parsed["diagnostics"][0]["line"], 1);
}

#[test]
fn prune_dry_run_keeps_document() {
    let ws = Workspace::new(TASKS, None);

    ws.cmd("prune")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(contains("would remove done tasks"));
    assert_eq!(fs::read_to_string(ws.tasks()).unwrap(), TASKS);

    ws.cmd("prune").assert().success();
    assert!(!fs::read_to_string(ws.tasks()).unwrap().contains("Ship v1"));
}

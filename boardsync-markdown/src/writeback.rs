//! Rewrites of the task document: id writeback and done-task pruning.
//!
//! Both rewrites are pure `&str -> Option<String>` functions (`None` = nothing
//! to change) with `_file` variants that write through a
//! `<path>.boardsync.tmp` sibling and an atomic rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use boardsync_core::types::{ItemId, SourcePosition};

use crate::error::{io_err, DocumentError};
use crate::parser::{
    id_in_comment, is_metadata_line, is_status_heading, is_task_heading, normalize_status,
};

/// A board id to record against the task heading at `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAssignment {
    pub position: SourcePosition,
    pub id: ItemId,
}

fn detect_eol(content: &str) -> &'static str {
    match content.find('\n') {
        Some(i) if i > 0 && content.as_bytes()[i - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches('\n').trim_end_matches('\r')
}

/// First id comment in the metadata zone starting at `start`, with its index.
///
/// The zone is what the parser reads as metadata: blank lines, id comments
/// and `- **Key:** value` lines.
fn existing_id<'a>(lines: &[&'a str], start: usize) -> Option<(usize, &'a str)> {
    for (index, raw) in lines.iter().enumerate().skip(start) {
        let line = strip_eol(raw);
        if let Some(id) = id_in_comment(line) {
            return Some((index, id));
        }
        if !(line.trim().is_empty() || is_metadata_line(line)) {
            return None;
        }
    }
    None
}

/// Inject or replace `<!-- id: ... -->` comments below task headings.
///
/// Assignments whose position no longer points at a task heading are skipped
/// with a warning; the document may have been edited since it was parsed.
pub fn writeback_ids(content: &str, assignments: &[IdAssignment]) -> Option<String> {
    if assignments.is_empty() {
        return None;
    }
    let by_line: HashMap<usize, &ItemId> = assignments
        .iter()
        .map(|a| (a.position.0, &a.id))
        .collect();

    let eol = detect_eol(content);
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut out = String::with_capacity(content.len() + assignments.len() * 32);
    let mut modified = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let line_no = i + 1;
        i += 1;

        let Some(new_id) = by_line.get(&line_no) else {
            out.push_str(line);
            continue;
        };
        if !is_task_heading(strip_eol(line)) {
            tracing::warn!("line {line_no} is no longer a task heading; id {new_id} not written");
            out.push_str(line);
            continue;
        }

        out.push_str(line);
        if !line.ends_with('\n') {
            out.push_str(eol);
        }

        let existing = existing_id(&lines, i);

        match existing {
            Some((_, current)) if current == new_id.as_str() => {
                tracing::debug!("line {line_no}: id {new_id} already present");
            }
            Some((at, stale)) => {
                for kept in &lines[i..at] {
                    out.push_str(kept);
                }
                out.push_str(&format!("<!-- id: {new_id} -->{eol}"));
                tracing::debug!("line {line_no}: replaced stale id {stale} -> {new_id}");
                i = at + 1;
                modified = true;
            }
            None => {
                out.push_str(&format!("<!-- id: {new_id} -->{eol}"));
                tracing::debug!("line {line_no}: injected id {new_id}");
                modified = true;
            }
        }
    }

    modified.then_some(out)
}

/// Remove every task block under a `Done` section, keeping the headings.
pub fn remove_done_tasks(content: &str) -> Option<String> {
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    let mut in_done = false;
    let mut dropping = false;
    let mut modified = false;

    for line in lines {
        let bare = strip_eol(line);
        if let Some(heading) = is_status_heading(bare) {
            in_done = normalize_status(heading) == "Done";
            dropping = false;
            kept.push(line);
            continue;
        }
        if is_task_heading(bare) {
            dropping = in_done;
            if dropping {
                modified = true;
                continue;
            }
        }
        if !dropping {
            kept.push(line);
        }
    }

    if !modified {
        return None;
    }

    let mut out = String::with_capacity(content.len());
    let mut last_blank = false;
    for line in kept {
        let blank = strip_eol(line).trim().is_empty();
        if blank && last_blank {
            continue;
        }
        out.push_str(line);
        last_blank = blank;
    }
    Some(out)
}

/// Apply [`writeback_ids`] to a file. Returns whether the file changed.
pub fn writeback_file(path: &Path, assignments: &[IdAssignment]) -> Result<bool, DocumentError> {
    rewrite_file(path, |content| writeback_ids(content, assignments))
}

/// Apply [`remove_done_tasks`] to a file. Returns whether the file changed.
pub fn remove_done_tasks_file(path: &Path) -> Result<bool, DocumentError> {
    rewrite_file(path, remove_done_tasks)
}

fn rewrite_file(
    path: &Path,
    rewrite: impl FnOnce(&str) -> Option<String>,
) -> Result<bool, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let Some(updated) = rewrite(&content) else {
        return Ok(false);
    };

    let tmp = PathBuf::from(format!("{}.boardsync.tmp", path.display()));
    std::fs::write(&tmp, updated).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    tracing::info!("rewrote {}", path.display());
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(line: usize, id: &str) -> IdAssignment {
        IdAssignment {
            position: SourcePosition(line),
            id: ItemId::from(id),
        }
    }

    #[test]
    fn injects_id_below_heading() {
        let doc = "## Todo\n\n### Write docs\n\nSome text.\n";
        let out = writeback_ids(doc, &[assign(3, "PVTI_1")]).expect("modified");
        assert_eq!(
            out,
            "## Todo\n\n### Write docs\n<!-- id: PVTI_1 -->\n\nSome text.\n"
        );
    }

    #[test]
    fn replaces_stale_id_after_blank_lines() {
        let doc = "## Todo\n### T\n\n<!-- id: OLD -->\nBody\n";
        let out = writeback_ids(doc, &[assign(2, "NEW")]).expect("modified");
        assert_eq!(out, "## Todo\n### T\n\n<!-- id: NEW -->\nBody\n");
    }

    #[test]
    fn replaces_stale_id_below_other_metadata() {
        let doc = "## Todo\n### T\n- **Labels:** bug\n<!-- id: OLD -->\nBody\n";
        let out = writeback_ids(doc, &[assign(2, "NEW")]).expect("modified");
        assert_eq!(
            out,
            "## Todo\n### T\n- **Labels:** bug\n<!-- id: NEW -->\nBody\n"
        );

        let reparsed = crate::parser::parse(&out);
        assert_eq!(reparsed.tasks[0].id, Some(ItemId::from("NEW")));
        assert!(reparsed.diagnostics.is_empty());
    }

    #[test]
    fn id_comment_inside_description_is_not_replaced() {
        let doc = "## Todo\n### T\nBody\n<!-- id: QUOTED -->\n";
        let out = writeback_ids(doc, &[assign(2, "NEW")]).expect("modified");
        assert_eq!(out, "## Todo\n### T\n<!-- id: NEW -->\nBody\n<!-- id: QUOTED -->\n");
    }

    #[test]
    fn correct_id_is_a_no_op() {
        let doc = "## Todo\n### T\n<!-- id: SAME -->\n";
        assert_eq!(writeback_ids(doc, &[assign(2, "SAME")]), None);
    }

    #[test]
    fn empty_assignments_are_a_no_op() {
        assert_eq!(writeback_ids("## Todo\n### T\n", &[]), None);
    }

    #[test]
    fn position_not_on_heading_is_skipped() {
        let doc = "## Todo\n### T\nBody\n";
        assert_eq!(writeback_ids(doc, &[assign(3, "X")]), None);
    }

    #[test]
    fn heading_on_last_line_without_newline() {
        let out = writeback_ids("## Todo\n### T", &[assign(2, "X")]).expect("modified");
        assert_eq!(out, "## Todo\n### T\n<!-- id: X -->\n");
    }

    #[test]
    fn preserves_crlf() {
        let doc = "## Todo\r\n### T\r\nBody\r\n";
        let out = writeback_ids(doc, &[assign(2, "X")]).expect("modified");
        assert_eq!(out, "## Todo\r\n### T\r\n<!-- id: X -->\r\nBody\r\n");
    }

    #[test]
    fn remove_done_keeps_heading_and_other_sections() {
        let doc = "\
## Todo
### Active
Keep.

## Done
### Finished
Remove.

### Also finished

## Later
### Planned
";
        let out = remove_done_tasks(doc).expect("modified");
        assert!(out.contains("### Active"));
        assert!(out.contains("## Done"));
        assert!(!out.contains("Finished") && !out.contains("Remove."));
        assert!(out.contains("### Planned"));
        assert!(!out.contains("\n\n\n"));
    }

    #[test]
    fn remove_done_is_idempotent() {
        let doc = "## Todo\n### A\n\n## Completed\n### B\n";
        let once = remove_done_tasks(doc).expect("modified");
        assert_eq!(remove_done_tasks(&once), None);
    }

    #[test]
    fn remove_done_without_done_tasks_is_a_no_op() {
        assert_eq!(remove_done_tasks("## Todo\n### A\n\n## Done\n\n"), None);
    }
}

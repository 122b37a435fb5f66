//! Pair document tasks with board items.
//!
//! Identifier matching is exact and case-sensitive, through an index built
//! once per pass. With [`SyncConfig::match_titles`] enabled, tasks left over
//! after identifier matching may claim an in-scope item with the same title.

use std::collections::HashMap;

use boardsync_core::config::SyncConfig;
use boardsync_core::types::{BoardItem, ItemId, Task};

use crate::diagnostic::{Diagnostic, DiagnosticKind};

/// How a pair was formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    Id,
    Title,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub task: Task,
    pub item: BoardItem,
    pub by: MatchedBy,
}

/// The three partitions plus duplicate/stale id diagnostics.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    /// In document order.
    pub pairs: Vec<MatchedPair>,
    /// In document order.
    pub unmatched_tasks: Vec<Task>,
    /// Unclaimed, in-scope items, in board order.
    pub orphans: Vec<BoardItem>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Whether `item` may be archived by a pass running with `config`.
pub fn in_scope(item: &BoardItem, config: &SyncConfig) -> bool {
    match config.scope_marker.as_deref() {
        Some(marker) => item.has_scope_marker(marker),
        None => true,
    }
}

enum Slot {
    Pending,
    Excluded,
    Matched(usize, MatchedBy),
}

/// Partition `tasks` and `items`.
pub fn match_tasks(tasks: &[Task], items: &[BoardItem], config: &SyncConfig) -> Matching {
    let index: HashMap<&str, usize> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (item.id.as_str(), i))
        .collect();

    let mut id_counts: HashMap<&ItemId, usize> = HashMap::new();
    for id in tasks.iter().filter_map(|t| t.id.as_ref()) {
        *id_counts.entry(id).or_default() += 1;
    }

    let mut claimed = vec![false; items.len()];
    let mut slots: Vec<Slot> = Vec::with_capacity(tasks.len());
    let mut diagnostics = Vec::new();

    for task in tasks {
        let Some(id) = &task.id else {
            slots.push(Slot::Pending);
            continue;
        };
        let found = index.get(id.as_str()).copied();
        if id_counts.get(id).copied().unwrap_or(0) > 1 {
            // The item stays claimed: a duplicate must never get it archived.
            if let Some(i) = found {
                claimed[i] = true;
            }
            diagnostics.push(Diagnostic::for_task(
                task,
                DiagnosticKind::DuplicateId { id: id.clone() },
            ));
            slots.push(Slot::Excluded);
            continue;
        }
        match found {
            Some(i) => {
                claimed[i] = true;
                slots.push(Slot::Matched(i, MatchedBy::Id));
            }
            None => slots.push(Slot::Pending),
        }
    }

    if config.match_titles {
        let mut by_title: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, item) in items.iter().enumerate() {
            if in_scope(item, config) {
                by_title.entry(item.title.as_str()).or_default().push(i);
            }
        }
        for (task, slot) in tasks.iter().zip(slots.iter_mut()) {
            if !matches!(slot, Slot::Pending) {
                continue;
            }
            let candidate = by_title
                .get(task.title.as_str())
                .and_then(|candidates| candidates.iter().copied().find(|i| !claimed[*i]));
            if let Some(i) = candidate {
                claimed[i] = true;
                tracing::info!(
                    "task '{}' matched by title to board item {}",
                    task.title,
                    items[i].id
                );
                *slot = Slot::Matched(i, MatchedBy::Title);
            }
        }
    }

    let mut matching = Matching {
        diagnostics,
        ..Matching::default()
    };
    for (task, slot) in tasks.iter().zip(slots) {
        match slot {
            Slot::Excluded => {}
            Slot::Matched(i, by) => matching.pairs.push(MatchedPair {
                task: task.clone(),
                item: items[i].clone(),
                by,
            }),
            Slot::Pending => {
                if let Some(id) = &task.id {
                    tracing::warn!(
                        "task '{}' references board id {} which was not found",
                        task.title,
                        id
                    );
                    matching
                        .diagnostics
                        .push(Diagnostic::for_task(task, DiagnosticKind::StaleId { id: id.clone() }));
                }
                matching.unmatched_tasks.push(task.clone());
            }
        }
    }

    matching.orphans = items
        .iter()
        .zip(&claimed)
        .filter(|(item, claimed)| !**claimed && in_scope(item, config))
        .map(|(item, _)| item.clone())
        .collect();

    matching
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[BoardItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn partitions_by_id() {
        let tasks = vec![
            Task::new("Linked", "Todo").with_id("A1"),
            Task::new("New", "Todo"),
        ];
        let items = vec![
            BoardItem::new("A1", "Linked", "Todo"),
            BoardItem::new("Z9", "Gone", "Todo"),
        ];
        let m = match_tasks(&tasks, &items, &SyncConfig::default());
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.pairs[0].by, MatchedBy::Id);
        assert_eq!(m.unmatched_tasks[0].title, "New");
        assert_eq!(ids(&m.orphans), ["Z9"]);
        assert!(m.diagnostics.is_empty());
    }

    #[test]
    fn id_match_is_case_sensitive() {
        let tasks = vec![Task::new("T", "Todo").with_id("a1")];
        let items = vec![BoardItem::new("A1", "T", "Todo")];
        let m = match_tasks(&tasks, &items, &SyncConfig::default());
        assert!(m.pairs.is_empty());
        assert_eq!(m.unmatched_tasks.len(), 1);
        assert_eq!(ids(&m.orphans), ["A1"]);
        assert!(matches!(m.diagnostics[0].kind, DiagnosticKind::StaleId { .. }));
    }

    #[test]
    fn scope_marker_limits_orphans() {
        let items = vec![
            BoardItem::new("OURS", "a", "Todo").with_scope_marker("repo-a"),
            BoardItem::new("THEIRS", "b", "Todo").with_scope_marker("repo-b"),
            BoardItem::new("UNMARKED", "c", "Todo"),
        ];
        let m = match_tasks(&[], &items, &SyncConfig::scoped("repo-a"));
        assert_eq!(ids(&m.orphans), ["OURS"]);

        let global = match_tasks(&[], &items, &SyncConfig::default());
        assert_eq!(ids(&global.orphans), ["OURS", "THEIRS", "UNMARKED"]);
    }

    #[test]
    fn duplicate_ids_exclude_every_holder_and_keep_item_claimed() {
        let tasks = vec![
            Task::new("First", "Todo").with_id("A1").at(3),
            Task::new("Second", "Todo").with_id("A1").at(9),
            Task::new("Fine", "Todo").with_id("B2"),
        ];
        let items = vec![
            BoardItem::new("A1", "First", "Todo"),
            BoardItem::new("B2", "Fine", "Todo"),
        ];
        let m = match_tasks(&tasks, &items, &SyncConfig::default());
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.pairs[0].task.title, "Fine");
        assert!(m.unmatched_tasks.is_empty());
        assert!(m.orphans.is_empty(), "duplicated item must not be archived");
        assert_eq!(m.diagnostics.len(), 2);
        assert!(m.diagnostics.iter().all(Diagnostic::is_error));
    }

    #[test]
    fn title_fallback_is_opt_in() {
        let tasks = vec![Task::new("Fix the bug", "Todo")];
        let items = vec![BoardItem::new("PVTI_99", "Fix the bug", "Todo")];

        let off = match_tasks(&tasks, &items, &SyncConfig::default());
        assert!(off.pairs.is_empty());

        let on = match_tasks(&tasks, &items, &SyncConfig::default().with_title_matching());
        assert_eq!(on.pairs.len(), 1);
        assert_eq!(on.pairs[0].by, MatchedBy::Title);
        assert!(on.orphans.is_empty());
    }

    #[test]
    fn title_fallback_recovers_stale_ids_without_double_claims() {
        let tasks = vec![
            Task::new("Dup", "Todo").with_id("GONE"),
            Task::new("Dup", "Done"),
        ];
        let items = vec![BoardItem::new("PVTI_1", "Dup", "Todo")];
        let m = match_tasks(&tasks, &items, &SyncConfig::default().with_title_matching());
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.pairs[0].task.status, "Todo");
        assert_eq!(m.unmatched_tasks.len(), 1);
        assert_eq!(m.unmatched_tasks[0].status, "Done");
    }

    #[test]
    fn title_fallback_never_steals_an_id_match() {
        let tasks = vec![
            Task::new("Same", "Todo"),
            Task::new("Same", "Todo").with_id("PVTI_1"),
        ];
        let items = vec![BoardItem::new("PVTI_1", "Same", "Todo")];
        let m = match_tasks(&tasks, &items, &SyncConfig::default().with_title_matching());
        assert_eq!(m.pairs.len(), 1);
        assert_eq!(m.pairs[0].by, MatchedBy::Id);
        assert_eq!(m.unmatched_tasks.len(), 1);
    }

    #[test]
    fn title_fallback_ignores_out_of_scope_items() {
        let tasks = vec![Task::new("Shared title", "Todo")];
        let items = vec![BoardItem::new("OTHER", "Shared title", "Todo").with_scope_marker("repo-b")];
        let config = SyncConfig::scoped("repo-a").with_title_matching();
        let m = match_tasks(&tasks, &items, &config);
        assert!(m.pairs.is_empty());
        assert_eq!(m.unmatched_tasks.len(), 1);
    }
}

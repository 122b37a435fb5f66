//! Snapshot board: a board kept in a local JSON file.
//!
//! Implements both [`BoardReader`] and [`BoardWriter`], so a pass can run
//! offline. Every mutation is saved straight away when the board is backed
//! by a file; writes use the `.tmp` + rename pattern.
//!
//! ```json
//! { "statuses": ["Todo", "Done"], "items": [...], "next_id": 3, "archived": [...] }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use boardsync_core::types::{Board, BoardItem, ContentKind, ItemId};

use crate::error::{io_err, SyncError};
use crate::remote::{BoardReader, BoardWriter, FieldChange, NewItem, RemoteError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(flatten)]
    board: Board,
    #[serde(default)]
    next_id: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    archived: Vec<BoardItem>,
}

#[derive(Debug, Clone)]
pub struct SnapshotBoard {
    path: Option<PathBuf>,
    file: SnapshotFile,
}

impl SnapshotBoard {
    pub fn in_memory(board: Board) -> Self {
        Self {
            path: None,
            file: SnapshotFile {
                board,
                ..SnapshotFile::default()
            },
        }
    }

    /// Load a snapshot file. A missing file is an empty, unconstrained board.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let file = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
            serde_json::from_str(&contents).map_err(|source| SyncError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!("{} not found; starting from an empty board", path.display());
            SnapshotFile::default()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            file,
        })
    }

    /// Write the snapshot back to its file. A no-op for in-memory boards.
    pub fn save(&self) -> Result<(), SyncError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let json = serde_json::to_string_pretty(&self.file).map_err(|source| SyncError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(path, e));
        }
        Ok(())
    }

    pub fn board(&self) -> &Board {
        &self.file.board
    }

    /// Items removed by [`BoardWriter::archive_item`], oldest first.
    pub fn archived(&self) -> &[BoardItem] {
        &self.file.archived
    }

    fn persist(&self) -> Result<(), RemoteError> {
        self.save().map_err(|e| RemoteError::Transport(e.to_string()))
    }

    fn allocate_id(&mut self) -> (ItemId, u64) {
        loop {
            self.file.next_id += 1;
            let n = self.file.next_id;
            let id = ItemId(format!("ITEM_{n}"));
            if self.file.board.find(&id).is_none() {
                return (id, n);
            }
        }
    }

    fn check_status(&self, status: &str) -> Result<String, RemoteError> {
        self.file
            .board
            .resolve_status(status)
            .ok_or_else(|| RemoteError::Api(format!("'{status}' is not a status option")))
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut BoardItem, RemoteError> {
        self.file
            .board
            .items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))
    }
}

impl BoardReader for SnapshotBoard {
    fn fetch_board(&mut self) -> Result<Board, RemoteError> {
        Ok(self.file.board.clone())
    }
}

impl BoardWriter for SnapshotBoard {
    fn create_item(&mut self, new: &NewItem) -> Result<BoardItem, RemoteError> {
        if new.kind == ContentKind::PullRequest {
            return Err(RemoteError::Unsupported(
                "pull requests cannot be created from a task".into(),
            ));
        }
        let status = self.check_status(&new.status)?;
        let (id, n) = self.allocate_id();
        let mut item = BoardItem::new(id, new.title.clone(), status)
            .with_kind(new.kind)
            .with_description(new.description.clone());
        if new.kind == ContentKind::Issue {
            item.content_id = Some(format!("ISSUE_{n}"));
        }
        self.file.board.items.push(item.clone());
        self.persist()?;
        Ok(item)
    }

    fn convert_item(&mut self, id: &ItemId, target: ContentKind) -> Result<BoardItem, RemoteError> {
        let n = self.file.next_id + 1;
        let item = self.item_mut(id)?;
        if !item.kind.converts_to(target) {
            return Err(RemoteError::Unsupported(format!(
                "cannot convert {} to {target}",
                item.kind
            )));
        }
        item.kind = target;
        item.content_id = Some(format!("ISSUE_{n}"));
        let converted = item.clone();
        self.file.next_id = n;
        self.persist()?;
        Ok(converted)
    }

    fn update_item(&mut self, id: &ItemId, changes: &[FieldChange]) -> Result<(), RemoteError> {
        let mut resolved = Vec::with_capacity(changes.len());
        for change in changes {
            match change {
                FieldChange::Status(status) => {
                    resolved.push(FieldChange::Status(self.check_status(status)?))
                }
                other => resolved.push(other.clone()),
            }
        }

        let item = self.item_mut(id)?;
        if let Some(change) = resolved.iter().find(|c| !item.kind.can_write(c.field())) {
            return Err(RemoteError::Unsupported(format!(
                "{} items cannot have {} written",
                item.kind,
                change.field()
            )));
        }
        for change in &resolved {
            change.apply_to(item);
        }
        if item.kind == ContentKind::Issue {
            item.scope_markers = item.labels.clone();
        }
        self.persist()
    }

    fn archive_item(&mut self, id: &ItemId) -> Result<(), RemoteError> {
        let index = self
            .file
            .board
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.clone()))?;
        let item = self.file.board.items.remove(index);
        self.file.archived.push(item);
        self.persist()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn draft(title: &str, status: &str) -> NewItem {
        NewItem {
            kind: ContentKind::Draft,
            title: title.into(),
            description: String::new(),
            status: status.into(),
        }
    }

    fn two_status_board() -> Board {
        Board {
            statuses: vec!["Todo".into(), "Done".into()],
            items: vec![],
        }
    }

    #[test]
    fn missing_file_loads_as_empty_board() {
        let tmp = TempDir::new().unwrap();
        let snapshot = SnapshotBoard::load(&tmp.path().join("board.json")).unwrap();
        assert!(snapshot.board().items.is_empty());
        assert!(snapshot.board().statuses.is_empty());
    }

    #[test]
    fn mutations_persist_to_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.json");
        let mut snapshot = SnapshotBoard::load(&path).unwrap();
        let created = snapshot.create_item(&draft("Write docs", "Todo")).unwrap();
        assert_eq!(created.id.as_str(), "ITEM_1");

        let reloaded = SnapshotBoard::load(&path).unwrap();
        assert_eq!(reloaded.board().items, vec![created]);
        assert!(
            !path.with_extension("json.tmp").exists(),
            "tmp file should be removed after atomic rename"
        );
    }

    #[test]
    fn ids_skip_existing_items() {
        let mut snapshot = SnapshotBoard::in_memory(Board {
            statuses: vec![],
            items: vec![BoardItem::new("ITEM_1", "taken", "Todo")],
        });
        let created = snapshot.create_item(&draft("next", "Todo")).unwrap();
        assert_eq!(created.id.as_str(), "ITEM_2");
    }

    #[test]
    fn status_is_validated_and_canonicalized() {
        let mut snapshot = SnapshotBoard::in_memory(two_status_board());
        let err = snapshot.create_item(&draft("x", "Blocked")).unwrap_err();
        assert!(matches!(err, RemoteError::Api(_)));

        let item = snapshot.create_item(&draft("x", "done")).unwrap();
        assert_eq!(item.status, "Done");
    }

    #[test]
    fn drafts_reject_issue_only_fields() {
        let mut snapshot = SnapshotBoard::in_memory(two_status_board());
        let item = snapshot.create_item(&draft("x", "Todo")).unwrap();
        let err = snapshot
            .update_item(&item.id, &[FieldChange::Assignee(Some("alice".into()))])
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unsupported(_)));
    }

    #[test]
    fn convert_keeps_id_and_issue_labels_become_scope_markers() {
        let mut snapshot = SnapshotBoard::in_memory(two_status_board());
        let item = snapshot.create_item(&draft("x", "Todo")).unwrap();
        let converted = snapshot.convert_item(&item.id, ContentKind::Issue).unwrap();
        assert_eq!(converted.id, item.id);
        assert_eq!(converted.kind, ContentKind::Issue);
        assert!(converted.content_id.is_some());

        let labels = ["repo-a".to_string()].into_iter().collect();
        snapshot
            .update_item(&item.id, &[FieldChange::Labels(labels)])
            .unwrap();
        assert!(snapshot.board().items[0].has_scope_marker("repo-a"));

        let again = snapshot.convert_item(&item.id, ContentKind::Issue).unwrap_err();
        assert!(matches!(again, RemoteError::Unsupported(_)));
    }

    #[test]
    fn archive_moves_item_aside() {
        let mut snapshot = SnapshotBoard::in_memory(Board {
            statuses: vec![],
            items: vec![BoardItem::new("Z9", "old", "Todo")],
        });
        snapshot.archive_item(&ItemId::from("Z9")).unwrap();
        assert!(snapshot.board().items.is_empty());
        assert_eq!(snapshot.archived().len(), 1);

        let missing = snapshot.archive_item(&ItemId::from("Z9")).unwrap_err();
        assert_eq!(missing, RemoteError::NotFound(ItemId::from("Z9")));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("board.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = SnapshotBoard::load(&path).unwrap_err();
        assert!(matches!(err, SyncError::Json { .. }));
    }
}

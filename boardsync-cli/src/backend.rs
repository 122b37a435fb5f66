//! Board selection: GitHub Projects or a local snapshot file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use boardsync_core::config::{self, Settings, SyncConfig};
use boardsync_core::types::{Board, BoardItem, ContentKind, ItemId};
use boardsync_github::GithubClient;
use boardsync_sync::{BoardReader, BoardWriter, FieldChange, NewItem, RemoteError, SnapshotBoard};

/// Board coordinates and engine options shared by `sync` and `plan`.
#[derive(Args, Debug)]
pub struct BoardArgs {
    /// Path to the task document.
    pub document: PathBuf,

    /// Organization or user owning the project board.
    #[arg(long)]
    pub owner: Option<String>,

    /// Project number on the owner's account.
    #[arg(long = "project")]
    pub project_number: Option<u64>,

    /// Use a local JSON snapshot instead of GitHub.
    #[arg(long, conflicts_with_all = ["owner", "project_number"])]
    pub board_file: Option<PathBuf>,

    /// Only items carrying this label may be archived.
    #[arg(long)]
    pub scope_label: Option<String>,

    /// Create new tasks as issues in this repository (owner/name).
    #[arg(long)]
    pub repo: Option<String>,

    /// Link tasks without an id to board items with the same title.
    #[arg(long)]
    pub match_titles: bool,

    /// Settings file (default: .boardsync.yaml next to the document).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GitHub token (default: $GITHUB_TOKEN).
    #[arg(long)]
    pub token: Option<String>,
}

impl BoardArgs {
    fn settings(&self) -> Result<Settings> {
        let (file, source) = config::discover(&self.document, self.config.as_deref())
            .context("failed to load configuration")?;
        if let Some(path) = source {
            log::debug!("using settings from {}", path.display());
        }
        let flags = Settings {
            owner: self.owner.clone(),
            project_number: self.project_number,
            scope_label: self.scope_label.clone(),
            target_repo: self.repo.clone(),
            match_titles: self.match_titles.then_some(true),
            token_env: None,
        };
        Ok(file.overlay(flags))
    }

    /// Resolve the engine configuration and open the board.
    pub fn connect(&self) -> Result<(SyncConfig, Remote)> {
        let settings = self.settings()?;
        let sync_config = settings.sync_config().context("invalid configuration")?;

        if let Some(path) = &self.board_file {
            let snapshot = SnapshotBoard::load(path)
                .with_context(|| format!("failed to load board file {}", path.display()))?;
            return Ok((sync_config, Remote::Snapshot(snapshot)));
        }

        let (owner, number) = settings
            .board_coordinates()
            .context("no board given; pass --owner and --project, or --board-file")?;
        let token = self
            .token
            .clone()
            .or_else(|| settings.token_from_env())
            .context("no GitHub token; pass --token or set GITHUB_TOKEN")?;
        let mut client = GithubClient::new(token, owner, number);
        if let Some(repo) = sync_config.target_repo.clone() {
            client = client.with_repo(repo);
        }
        Ok((sync_config, Remote::Github(client)))
    }
}

/// The board a command talks to.
pub enum Remote {
    Github(GithubClient),
    Snapshot(SnapshotBoard),
}

impl BoardReader for Remote {
    fn fetch_board(&mut self) -> Result<Board, RemoteError> {
        match self {
            Remote::Github(c) => c.fetch_board(),
            Remote::Snapshot(s) => s.fetch_board(),
        }
    }
}

impl BoardWriter for Remote {
    fn create_item(&mut self, item: &NewItem) -> Result<BoardItem, RemoteError> {
        match self {
            Remote::Github(c) => c.create_item(item),
            Remote::Snapshot(s) => s.create_item(item),
        }
    }

    fn convert_item(&mut self, id: &ItemId, target: ContentKind) -> Result<BoardItem, RemoteError> {
        match self {
            Remote::Github(c) => c.convert_item(id, target),
            Remote::Snapshot(s) => s.convert_item(id, target),
        }
    }

    fn update_item(&mut self, id: &ItemId, changes: &[FieldChange]) -> Result<(), RemoteError> {
        match self {
            Remote::Github(c) => c.update_item(id, changes),
            Remote::Snapshot(s) => s.update_item(id, changes),
        }
    }

    fn archive_item(&mut self, id: &ItemId) -> Result<(), RemoteError> {
        match self {
            Remote::Github(c) => c.archive_item(id),
            Remote::Snapshot(s) => s.archive_item(id),
        }
    }
}

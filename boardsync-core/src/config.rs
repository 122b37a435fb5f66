//! Settings file discovery and the explicit engine configuration.
//!
//! # Lookup order
//!
//! 1. `--config <path>` (must exist)
//! 2. `.boardsync.yaml` next to the task document
//! 3. `<config_dir>/boardsync/config.yaml` (via `dirs::config_dir()`)
//!
//! A missing file yields [`Settings::default`]. Command-line flags are layered
//! on top with [`Settings::overlay`].
//!
//! Every lookup has two forms, mirroring the rest of the workspace:
//! `fn_at(dir, …)` takes an explicit directory and is what tests call.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

/// File name looked up next to the task document.
pub const LOCAL_FILE_NAME: &str = ".boardsync.yaml";

/// Environment variables consulted for the API token, in order, after the
/// variable named by `token_env`.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "BOARDSYNC_GITHUB_TOKEN"];

// ---------------------------------------------------------------------------
// RepoRef
// ---------------------------------------------------------------------------

/// `owner/name` of the repository new issues are created in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ConfigError::InvalidRepo(s.to_string()))?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ConfigError::InvalidRepo(s.to_string()));
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

// ---------------------------------------------------------------------------
// SyncConfig: what the engine sees
// ---------------------------------------------------------------------------

/// Configuration for one reconciliation pass. Passed explicitly into the
/// matcher and plan builder; nothing is read from process-global state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncConfig {
    /// Only items carrying this marker may be archived. `None` = global mode.
    pub scope_marker: Option<String>,
    /// When set, new tasks and draft items target real issues in this repo.
    pub target_repo: Option<RepoRef>,
    /// Fall back to title matching for tasks without a usable identifier.
    pub match_titles: bool,
}

impl SyncConfig {
    pub fn scoped(marker: impl Into<String>) -> Self {
        Self {
            scope_marker: Some(marker.into()),
            ..Self::default()
        }
    }

    pub fn with_target_repo(mut self, repo: RepoRef) -> Self {
        self.target_repo = Some(repo);
        self
    }

    pub fn with_title_matching(mut self) -> Self {
        self.match_titles = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Settings: what the YAML file holds
// ---------------------------------------------------------------------------

/// On-disk settings. Every field is optional so flags can fill the gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Organization or user login owning the project board.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_label: Option<String>,
    /// `owner/name`; parsed lazily by [`Settings::sync_config`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_titles: Option<bool>,
    /// Name of the environment variable holding the API token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

impl Settings {
    /// Layer `top` over `self`: any value set in `top` wins.
    pub fn overlay(self, top: Settings) -> Settings {
        Settings {
            owner: top.owner.or(self.owner),
            project_number: top.project_number.or(self.project_number),
            scope_label: top.scope_label.or(self.scope_label),
            target_repo: top.target_repo.or(self.target_repo),
            match_titles: top.match_titles.or(self.match_titles),
            token_env: top.token_env.or(self.token_env),
        }
    }

    /// Build the engine configuration, validating the repository reference.
    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        let target_repo = self
            .target_repo
            .as_deref()
            .map(RepoRef::from_str)
            .transpose()?;
        Ok(SyncConfig {
            scope_marker: self.scope_label.clone().filter(|s| !s.trim().is_empty()),
            target_repo,
            match_titles: self.match_titles.unwrap_or(false),
        })
    }

    /// Board coordinates, required when talking to the remote board.
    pub fn board_coordinates(&self) -> Result<(String, u64), ConfigError> {
        let owner = self.owner.clone().ok_or(ConfigError::Missing("owner"))?;
        let number = self
            .project_number
            .ok_or(ConfigError::Missing("project_number"))?;
        Ok((owner, number))
    }

    /// Resolve the API token from the environment.
    pub fn token_from_env(&self) -> Option<String> {
        self.token_env
            .iter()
            .map(String::as_str)
            .chain(TOKEN_ENV_VARS.iter().copied())
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load settings from `path`. Returns defaults if the file does not exist.
pub fn load_at(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `<config_dir>/boardsync/config.yaml` for an explicit config root.
pub fn user_config_path_at(config_dir: &Path) -> PathBuf {
    config_dir.join("boardsync").join("config.yaml")
}

/// Discover settings for `document`, rooted at an explicit user config dir.
///
/// Returns the settings together with the file they came from, if any.
pub fn discover_at(
    document: &Path,
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<(Settings, Option<PathBuf>), ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(io_err(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
            ));
        }
        return Ok((load_at(path)?, Some(path.to_path_buf())));
    }

    let local = document
        .parent()
        .map(|dir| dir.join(LOCAL_FILE_NAME))
        .filter(|p| p.exists());
    if let Some(path) = local {
        return Ok((load_at(&path)?, Some(path)));
    }

    let user = config_dir
        .map(user_config_path_at)
        .filter(|p| p.exists());
    match user {
        Some(path) => Ok((load_at(&path)?, Some(path))),
        None => Ok((Settings::default(), None)),
    }
}

/// `discover_at` convenience wrapper using `dirs::config_dir()`.
pub fn discover(
    document: &Path,
    explicit: Option<&Path>,
) -> Result<(Settings, Option<PathBuf>), ConfigError> {
    discover_at(document, explicit, dirs::config_dir().as_deref())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

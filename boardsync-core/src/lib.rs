//! boardsync core library: domain types, capability table, configuration.
//!
//! - [`types`]: document model, board model, content kinds and writable fields
//! - [`config`]: YAML settings file discovery and loading
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{RepoRef, Settings, SyncConfig};
pub use error::ConfigError;
pub use types::{
    Board, BoardItem, ContentKind, Field, FieldSet, ItemId, SourcePosition, Task,
};

//! Error types for boardsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that abort a pass before any operation runs.
///
/// Per-operation failures never surface here; they become
/// [`Outcome::Failed`](crate::Outcome) results in the report.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The board could not be fetched at all (network, authorization, ...).
    #[error("failed to fetch board state: {0}")]
    Fetch(#[source] RemoteError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot board JSON could not be read or written.
    #[error("snapshot JSON error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

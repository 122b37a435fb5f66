//! Error types for boardsync-markdown.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading or rewriting a task document.
///
/// Parsing itself never fails: malformed lines become diagnostics.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`DocumentError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DocumentError {
    DocumentError::Io {
        path: path.into(),
        source,
    }
}

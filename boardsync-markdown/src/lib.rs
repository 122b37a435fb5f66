//! # boardsync-markdown
//!
//! The task document: parse `TASKS.md` into [`Task`](boardsync_core::Task)
//! records, write assigned board ids back into it, and prune finished tasks.
//!
//! The sync engine never touches the document; everything that reads or
//! rewrites the text lives here.

pub mod error;
pub mod parser;
pub mod writeback;

pub use error::DocumentError;
pub use parser::{normalize_status, parse, parse_file, ParseDiagnostic, ParsedDocument};
pub use writeback::{
    remove_done_tasks, remove_done_tasks_file, writeback_file, writeback_ids, IdAssignment,
};

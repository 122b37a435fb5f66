//! # boardsync-sync
//!
//! The reconciliation engine: document tasks in, board operations out.
//!
//! ```text
//! tasks ─┐
//!        ├─ matcher ─ compare ─ plan ─ executor ─ ExecutionReport
//! board ─┘
//! ```
//!
//! [`build_plan`] is pure. [`Executor`] is the only piece that touches the
//! remote board, through the [`BoardWriter`] collaborator, and
//! [`pipeline::run`] wires fetch → plan → execute for callers.

pub mod compare;
pub mod diagnostic;
pub mod error;
pub mod executor;
pub mod matcher;
pub mod pipeline;
pub mod plan;
pub mod remote;
pub mod snapshot;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::SyncError;
pub use executor::{CancelFlag, ExecutionReport, Executor, ItemState, Mode, OperationResult, Outcome};
pub use plan::{build_plan, IdLink, Operation, OperationKind, Plan, PlanSummary};
pub use remote::{BoardReader, BoardWriter, FieldChange, NewItem, RemoteError};
pub use snapshot::SnapshotBoard;

//! Fetch → plan → execute, the entrypoint used by the CLI.

use boardsync_core::config::SyncConfig;
use boardsync_core::types::Task;

use crate::executor::{CancelFlag, ExecutionReport, Executor, Mode};
use crate::plan::{build_plan, Plan};
use crate::remote::{BoardReader, BoardWriter};
use crate::SyncError;

/// Fetch the board and build the plan for `tasks` without executing it.
pub fn plan<R: BoardReader + ?Sized>(
    remote: &mut R,
    tasks: &[Task],
    config: &SyncConfig,
) -> Result<Plan, SyncError> {
    let board = remote.fetch_board().map_err(SyncError::Fetch)?;
    tracing::debug!(
        "fetched board: {} items, {} statuses",
        board.items.len(),
        board.statuses.len()
    );
    let plan = build_plan(tasks, &board, config);
    tracing::info!("plan: {}", plan.summary());
    Ok(plan)
}

/// Run one reconciliation pass.
///
/// A failed fetch aborts before any plan exists. Failures of individual
/// operations are reported in the returned [`ExecutionReport`].
pub fn run<R>(
    remote: &mut R,
    tasks: &[Task],
    config: &SyncConfig,
    mode: Mode,
    cancel: CancelFlag,
) -> Result<ExecutionReport, SyncError>
where
    R: BoardReader + BoardWriter + ?Sized,
{
    let plan = plan(remote, tasks, config)?;
    Ok(Executor::new(remote, mode).with_cancel(cancel).run(plan))
}

//! The unit of saga work.

use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{FailedReason, RollbackData};

/// Outcome of running one state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunResult {
    /// Data to undo the step's side effect, recorded as a rollback reference.
    pub rollback_data: Option<RollbackData>,
    /// Set when the step failed; the saga moves to Failed and compensates.
    pub failed: Option<FailedReason>,
}

impl RunResult {
    /// A step without side effects to undo.
    pub fn ok() -> Self {
        Self::default()
    }

    /// A step that produced compensable data.
    pub fn with_rollback(data: RollbackData) -> Self {
        Self {
            rollback_data: Some(data),
            failed: None,
        }
    }

    /// A failed step.
    pub fn failed(reason: FailedReason) -> Self {
        Self {
            rollback_data: None,
            failed: Some(reason),
        }
    }
}

/// One step of the place-order saga.
///
/// `run` decides the next state by calling `Process::update_state` before it
/// returns. Failures are reported through `RunResult::failed`, never by
/// panicking or returning early from the loop.
#[async_trait]
pub trait State: Send + Sync {
    /// Stable, unique name used for persistence and dispatch.
    fn name(&self) -> &'static str;

    /// Performs the step.
    async fn run(&self, process: &mut Process) -> RunResult;

    /// Undoes the step using data it returned from `run`.
    async fn rollback(&self, data: &RollbackData) -> Result<(), RollbackError>;

    /// True only for Success and Failed.
    fn is_final(&self) -> bool;

    /// True for states that wait on the customer. The driving loop suspends here.
    fn is_blocking(&self) -> bool {
        false
    }
}

/// Builds the error for rollback data of the wrong shape.
pub(crate) fn unexpected_data(
    state: &'static str,
    expected: &'static str,
    found: &RollbackData,
) -> RollbackError {
    RollbackError::UnexpectedData {
        state,
        expected,
        found: found.kind(),
    }
}

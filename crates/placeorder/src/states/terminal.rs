//! Final states. Neither has side effects.

use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::RollbackData;
use crate::process::state::{RunResult, State};

#[derive(Debug, Clone, Copy, Default)]
pub struct Success;

impl Success {
    pub const NAME: &'static str = "Success";
}

#[async_trait]
impl State for Success {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, _process: &mut Process) -> RunResult {
        RunResult::ok()
    }

    async fn rollback(&self, _data: &RollbackData) -> Result<(), RollbackError> {
        Ok(())
    }

    fn is_final(&self) -> bool {
        true
    }
}

/// The reason is kept on the context, see `Context::failed_reason`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failed;

impl Failed {
    pub const NAME: &'static str = "Failed";
}

#[async_trait]
impl State for Failed {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, _process: &mut Process) -> RunResult {
        RunResult::ok()
    }

    async fn rollback(&self, _data: &RollbackData) -> Result<(), RollbackError> {
        Ok(())
    }

    fn is_final(&self) -> bool {
        true
    }
}

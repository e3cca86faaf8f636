use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{FailedReason, RollbackData, StateData};
use crate::process::state::{RunResult, State};
use crate::states::{CreatePayment, PlaceOrder};

/// Entry state. Free carts skip the payment gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct New;

impl New {
    pub const NAME: &'static str = "New";
}

#[async_trait]
impl State for New {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let next = match process.context().cart().grand_total() {
            Some(total) if total.is_zero() => PlaceOrder::NAME,
            Some(_) => CreatePayment::NAME,
            None => {
                return RunResult::failed(FailedReason::error_occurred(
                    "cart total is out of range",
                ));
            }
        };
        process.update_state(next, StateData::None);
        RunResult::ok()
    }

    async fn rollback(&self, _data: &RollbackData) -> Result<(), RollbackError> {
        Ok(())
    }

    fn is_final(&self) -> bool {
        false
    }
}

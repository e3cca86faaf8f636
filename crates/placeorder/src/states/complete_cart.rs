use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{FailedReason, RollbackData, StateData};
use crate::process::state::{RunResult, State, unexpected_data};
use crate::services::CartService;
use crate::states::PlaceOrder;

/// Locks the cart before the order is placed; compensation reopens it.
pub struct CompleteCart {
    carts: Arc<dyn CartService>,
}

impl CompleteCart {
    pub const NAME: &'static str = "CompleteCart";

    pub fn new(carts: Arc<dyn CartService>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl State for CompleteCart {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        let completed = match self.carts.complete_cart(process.context().cart()).await {
            Ok(cart) => cart,
            Err(e) => return RunResult::failed(FailedReason::error_occurred(e)),
        };

        process.update_state(PlaceOrder::NAME, StateData::None);
        RunResult::with_rollback(RollbackData::CompleteCart { cart: completed })
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), RollbackError> {
        let RollbackData::CompleteCart { cart } = data else {
            return Err(unexpected_data(Self::NAME, "CompleteCart", data));
        };
        self.carts.restore_cart(cart).await?;
        Ok(())
    }

    fn is_final(&self) -> bool {
        false
    }
}

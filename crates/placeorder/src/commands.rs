//! Command inputs and the status every command reports.

use common::SagaId;
use domain::{Cart, PlaceOrderInfo};
use serde::{Deserialize, Serialize};

use crate::process::context::{Context, FailedReason, StateData};

/// Starts a new place-order saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPlaceOrder {
    pub cart: Cart,
    pub return_address: String,
}

impl StartPlaceOrder {
    pub fn new(cart: Cart, return_address: impl Into<String>) -> Self {
        Self {
            cart,
            return_address: return_address.into(),
        }
    }
}

/// Where a saga stands after a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderStatus {
    pub saga_id: SagaId,
    pub state: String,
    /// What an interactive state needs rendered, e.g. a redirect URL.
    pub state_data: StateData,
    pub failed_reason: Option<FailedReason>,
    pub order_info: Option<PlaceOrderInfo>,
}

impl PlaceOrderStatus {
    /// Human readable failure reason, empty unless the saga failed.
    pub fn failed_reason_text(&self) -> String {
        self.failed_reason
            .as_ref()
            .map(FailedReason::reason)
            .unwrap_or_default()
    }
}

impl From<&Context> for PlaceOrderStatus {
    fn from(context: &Context) -> Self {
        Self {
            saga_id: context.id(),
            state: context.current_state_name().to_string(),
            state_data: context.current_state_data().clone(),
            failed_reason: context.failed_reason().cloned(),
            order_info: context.order_info().cloned(),
        }
    }
}

//! Builds processes for new and reloaded sagas.

use std::sync::Arc;

use common::SagaId;
use domain::Cart;
use url::Url;

use crate::error::{PlaceOrderError, Result};
use crate::process::Process;
use crate::process::context::Context;
use crate::process::registry::StateRegistry;

/// Creates processes bound to one state registry.
#[derive(Debug, Clone)]
pub struct ProcessFactory {
    registry: Arc<StateRegistry>,
}

impl ProcessFactory {
    pub fn new(registry: Arc<StateRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    /// Starts a new saga for `cart` at the registry's start state.
    ///
    /// Only checks what the saga cannot run without: a parseable return
    /// address and at least one cart item. Payment checks happen in the
    /// states.
    pub fn new_process(&self, cart: Cart, return_address: &str) -> Result<Process> {
        let return_address =
            Url::parse(return_address).map_err(|e| PlaceOrderError::InvalidReturnAddress {
                address: return_address.to_string(),
                reason: e.to_string(),
            })?;

        if cart.is_empty() {
            return Err(PlaceOrderError::InvalidCart(format!(
                "cart {} has no items",
                cart.id
            )));
        }
        let Some(total) = cart.grand_total() else {
            return Err(PlaceOrderError::InvalidCart(format!(
                "cart {} total is out of range",
                cart.id
            )));
        };
        if total.is_negative() {
            return Err(PlaceOrderError::InvalidCart(format!(
                "cart {} has a negative total",
                cart.id
            )));
        }

        let context = Context::new(
            SagaId::new(),
            self.registry.start_state(),
            cart,
            return_address,
        );
        tracing::debug!(saga_id = %context.id(), "new place order process");
        Ok(Process::new(context, self.registry.clone()))
    }

    /// Wraps a context loaded from the store.
    pub fn restore(&self, context: Context) -> Process {
        Process::new(context, self.registry.clone())
    }
}

//! Payment gateway port and gateway registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Cart, FlowResult, FlowStatus, Payment, PaymentMethod};
use url::Url;

use crate::error::{GatewayError, PaymentServiceError};

/// A payment provider integration.
///
/// Flows are correlated by an ID chosen by the saga (its saga ID).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Payment methods offered by this gateway.
    fn methods(&self) -> Vec<PaymentMethod>;

    /// Starts a payment flow for the cart.
    async fn start_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
        return_address: &Url,
    ) -> Result<FlowResult, GatewayError>;

    /// Reports the current status of a flow.
    async fn flow_status(&self, cart: &Cart, correlation_id: &str)
    -> Result<FlowStatus, GatewayError>;

    /// Confirms an approved payment once the order exists.
    async fn confirm_result(&self, cart: &Cart, payment: &Payment) -> Result<(), GatewayError>;

    /// Returns the payment the order should be placed with.
    async fn order_payment_from_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
    ) -> Result<Payment, GatewayError>;

    /// Cancels a payment that will not be used for an order.
    async fn cancel_order_payment(&self, payment: &Payment) -> Result<(), GatewayError>;
}

/// Registry of payment gateways by code.
#[derive(Clone, Default)]
pub struct PaymentService {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
}

impl PaymentService {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway (builder style). A later registration under the
    /// same code replaces the earlier one.
    pub fn with_gateway(mut self, code: impl Into<String>, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(code.into(), gateway);
        self
    }

    /// Returns the gateway registered under `code`.
    pub fn gateway(&self, code: &str) -> Result<Arc<dyn PaymentGateway>, PaymentServiceError> {
        self.gateways
            .get(code)
            .cloned()
            .ok_or_else(|| PaymentServiceError::GatewayNotFound(code.to_string()))
    }

    /// Returns the gateway selected on the cart.
    pub fn gateway_by_cart(
        &self,
        cart: &Cart,
    ) -> Result<Arc<dyn PaymentGateway>, PaymentServiceError> {
        let selection = cart
            .payment_selection
            .as_ref()
            .ok_or(PaymentServiceError::PaymentSelectionNotSet)?;
        self.gateway(&selection.gateway)
    }

    /// Registered gateway codes, sorted.
    pub fn available_gateways(&self) -> Vec<&str> {
        let mut codes: Vec<_> = self.gateways.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("gateways", &self.available_gateways())
            .finish()
    }
}

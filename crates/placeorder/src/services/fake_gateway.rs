//! Scripted payment gateway for tests and local wiring.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use domain::{
    Cart, FlowAction, FlowError, FlowResult, FlowState, FlowStatus, FormField, Payment,
    PaymentMethod, PaymentRequestApi, WalletDetails,
};
use url::Url;

use crate::error::GatewayError;
use crate::services::payment::PaymentGateway;

/// Gateway code the fake gateway registers under by default.
pub const FAKE_GATEWAY_CODE: &str = "fake_payment_gateway";

pub const METHOD_COMPLETED: &str = "payment_completed";
pub const METHOD_APPROVED: &str = "payment_approved";
pub const METHOD_WAITING_FOR_CUSTOMER: &str = "payment_waiting_for_customer";
pub const METHOD_UNAPPROVED_REDIRECT: &str = "payment_unapproved_redirect";
pub const METHOD_UNAPPROVED_POST_REDIRECT: &str = "payment_unapproved_post_redirect";
pub const METHOD_UNAPPROVED_IFRAME: &str = "payment_unapproved_iframe";
pub const METHOD_UNAPPROVED_HTML: &str = "payment_unapproved_html";
pub const METHOD_UNAPPROVED_WALLET: &str = "payment_unapproved_wallet";
pub const METHOD_CANCELLED_BY_CUSTOMER: &str = "payment_cancelled_by_customer";
pub const METHOD_FAILED: &str = "payment_failed";
/// Status queries for this method fail at the transport level.
pub const METHOD_ERROR: &str = "payment_error";

const METHODS: [&str; 11] = [
    METHOD_COMPLETED,
    METHOD_APPROVED,
    METHOD_WAITING_FOR_CUSTOMER,
    METHOD_UNAPPROVED_REDIRECT,
    METHOD_UNAPPROVED_POST_REDIRECT,
    METHOD_UNAPPROVED_IFRAME,
    METHOD_UNAPPROVED_HTML,
    METHOD_UNAPPROVED_WALLET,
    METHOD_CANCELLED_BY_CUSTOMER,
    METHOD_FAILED,
    METHOD_ERROR,
];

#[derive(Debug)]
struct Flow {
    method: String,
    status: FlowStatus,
    payment: Option<Payment>,
}

#[derive(Debug, Default)]
struct FakeGatewayState {
    flows: HashMap<String, Flow>,
    next_id: u32,
    early_place_order: bool,
    fail_on_start_flow: bool,
    fail_on_order_payment: bool,
    fail_on_cancel: bool,
    cancelled: Vec<String>,
    confirmed: Vec<String>,
}

/// In-memory gateway whose behaviour is selected by the payment method code.
///
/// Each method code scripts the status a new flow reports. Tests move a flow
/// along with [`FakePaymentGateway::set_flow_status`], the way a customer
/// finishing a redirect would.
#[derive(Debug, Clone)]
pub struct FakePaymentGateway {
    code: String,
    state: Arc<RwLock<FakeGatewayState>>,
}

impl Default for FakePaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePaymentGateway {
    /// Creates a gateway using [`FAKE_GATEWAY_CODE`].
    pub fn new() -> Self {
        Self::with_code(FAKE_GATEWAY_CODE)
    }

    /// Creates a gateway reporting payments under `code`.
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            state: Arc::default(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Makes new flows request early order placement.
    pub fn set_early_place_order(&self, early: bool) {
        self.write().early_place_order = early;
    }

    /// Configures `start_flow` to fail.
    pub fn set_fail_on_start_flow(&self, fail: bool) {
        self.write().fail_on_start_flow = fail;
    }

    /// Configures `order_payment_from_flow` to fail.
    pub fn set_fail_on_order_payment(&self, fail: bool) {
        self.write().fail_on_order_payment = fail;
    }

    /// Configures `cancel_order_payment` to fail.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
    }

    /// Overrides the status of a started flow. Returns false if no such flow exists.
    pub fn set_flow_status(&self, correlation_id: &str, status: FlowStatus) -> bool {
        match self.write().flows.get_mut(correlation_id) {
            Some(flow) => {
                flow.status = status;
                true
            }
            None => false,
        }
    }

    /// IDs of cancelled payments, in cancellation order.
    pub fn cancelled_payments(&self) -> Vec<String> {
        self.read().cancelled.clone()
    }

    /// IDs of confirmed payments, in confirmation order.
    pub fn confirmed_payments(&self) -> Vec<String> {
        self.read().confirmed.clone()
    }

    /// Number of flows started.
    pub fn flow_count(&self) -> usize {
        self.read().flows.len()
    }

    fn read(&self) -> RwLockReadGuard<'_, FakeGatewayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FakeGatewayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn scripted_status(
        method: &str,
        correlation_id: &str,
        return_address: &Url,
    ) -> Result<FlowStatus, GatewayError> {
        let status = match method {
            METHOD_COMPLETED => FlowStatus::new(FlowState::Completed),
            METHOD_APPROVED => FlowStatus::new(FlowState::Approved),
            METHOD_WAITING_FOR_CUSTOMER => FlowStatus::new(FlowState::WaitingForCustomer),
            METHOD_UNAPPROVED_REDIRECT => FlowStatus::unapproved(FlowAction::Redirect {
                url: return_address.clone(),
            }),
            METHOD_UNAPPROVED_POST_REDIRECT => {
                let mut form_fields = BTreeMap::new();
                form_fields.insert(
                    "correlation_id".to_string(),
                    FormField::single(correlation_id),
                );
                FlowStatus::unapproved(FlowAction::PostRedirect {
                    url: return_address.clone(),
                    form_fields,
                })
            }
            METHOD_UNAPPROVED_IFRAME => FlowStatus::unapproved(FlowAction::ShowIframe {
                url: return_address.clone(),
            }),
            METHOD_UNAPPROVED_HTML => FlowStatus::unapproved(FlowAction::ShowHtml {
                html: format!("<h2>Pay order {}</h2>", correlation_id),
            }),
            METHOD_UNAPPROVED_WALLET => {
                FlowStatus::unapproved(FlowAction::ShowWalletPayment(WalletDetails {
                    used_payment_method: method.to_string(),
                    payment_request_api: PaymentRequestApi::default(),
                }))
            }
            METHOD_CANCELLED_BY_CUSTOMER => FlowStatus::new(FlowState::Cancelled),
            METHOD_FAILED => FlowStatus::failed(FlowError::new(
                "payment_failed",
                "Payment was declined by the fake gateway",
            )),
            METHOD_ERROR => FlowStatus::new(FlowState::Unapproved),
            other => {
                return Err(GatewayError::Rejected(format!(
                    "unknown payment method '{}'",
                    other
                )));
            }
        };
        Ok(status)
    }
}

#[async_trait]
impl PaymentGateway for FakePaymentGateway {
    fn methods(&self) -> Vec<PaymentMethod> {
        METHODS
            .iter()
            .map(|code| PaymentMethod::new(*code, code.replace('_', " ")))
            .collect()
    }

    async fn start_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
        return_address: &Url,
    ) -> Result<FlowResult, GatewayError> {
        let mut state = self.write();

        if state.fail_on_start_flow {
            return Err(GatewayError::Rejected("start flow failed".to_string()));
        }

        let method = cart
            .payment_selection
            .as_ref()
            .map(|s| s.method.clone())
            .unwrap_or_default();
        let status = Self::scripted_status(&method, correlation_id, return_address)?;

        state.flows.insert(
            correlation_id.to_string(),
            Flow {
                method,
                status: status.clone(),
                payment: None,
            },
        );

        Ok(FlowResult {
            early_place_order: state.early_place_order,
            status,
        })
    }

    async fn flow_status(
        &self,
        _cart: &Cart,
        correlation_id: &str,
    ) -> Result<FlowStatus, GatewayError> {
        let state = self.read();
        let flow = state
            .flows
            .get(correlation_id)
            .ok_or_else(|| GatewayError::FlowNotFound(correlation_id.to_string()))?;

        if flow.method == METHOD_ERROR {
            return Err(GatewayError::Rejected("flow status unavailable".to_string()));
        }
        Ok(flow.status.clone())
    }

    async fn confirm_result(&self, _cart: &Cart, payment: &Payment) -> Result<(), GatewayError> {
        self.write().confirmed.push(payment.payment_id.clone());
        Ok(())
    }

    async fn order_payment_from_flow(
        &self,
        cart: &Cart,
        correlation_id: &str,
    ) -> Result<Payment, GatewayError> {
        let mut guard = self.write();
        let state = &mut *guard;

        if state.fail_on_order_payment {
            return Err(GatewayError::Rejected("no payment for flow".to_string()));
        }

        let flow = state
            .flows
            .get_mut(correlation_id)
            .ok_or_else(|| GatewayError::FlowNotFound(correlation_id.to_string()))?;

        if let Some(payment) = &flow.payment {
            return Ok(payment.clone());
        }

        let amount = cart
            .grand_total()
            .ok_or_else(|| GatewayError::Rejected("cart total is out of range".to_string()))?;

        state.next_id += 1;
        let payment = Payment {
            gateway: self.code.clone(),
            payment_id: format!("PAY-{:04}", state.next_id),
            method: flow.method.clone(),
            amount,
        };
        flow.payment = Some(payment.clone());
        Ok(payment)
    }

    async fn cancel_order_payment(&self, payment: &Payment) -> Result<(), GatewayError> {
        let mut state = self.write();

        if state.fail_on_cancel {
            return Err(GatewayError::Rejected(format!(
                "cannot cancel payment {}",
                payment.payment_id
            )));
        }

        state.cancelled.push(payment.payment_id.clone());
        Ok(())
    }
}

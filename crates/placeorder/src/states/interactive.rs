//! States that wait on the customer.
//!
//! All of them behave the same: re-check the payment on every refresh and
//! either stay (with fresh data) or move on. They differ only in name, which
//! tells the frontend what to render from the state data.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{RollbackData, StateData};
use crate::process::state::{RunResult, State};
use crate::validator::PaymentValidator;

/// A blocking state backed by the payment validator.
pub struct Interactive {
    name: &'static str,
    validator: Arc<dyn PaymentValidator>,
}

impl Interactive {
    pub const REDIRECT: &'static str = "Redirect";
    pub const POST_REDIRECT: &'static str = "PostRedirect";
    pub const SHOW_IFRAME: &'static str = "ShowIframe";
    pub const SHOW_HTML: &'static str = "ShowHTML";
    pub const SHOW_WALLET_PAYMENT: &'static str = "ShowWalletPayment";
    pub const WAIT_FOR_CUSTOMER: &'static str = "WaitForCustomer";

    /// Every interactive state name.
    pub const NAMES: [&'static str; 6] = [
        Self::REDIRECT,
        Self::POST_REDIRECT,
        Self::SHOW_IFRAME,
        Self::SHOW_HTML,
        Self::SHOW_WALLET_PAYMENT,
        Self::WAIT_FOR_CUSTOMER,
    ];

    fn new(name: &'static str, validator: Arc<dyn PaymentValidator>) -> Self {
        Self { name, validator }
    }

    pub fn redirect(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::REDIRECT, validator)
    }

    pub fn post_redirect(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::POST_REDIRECT, validator)
    }

    pub fn show_iframe(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::SHOW_IFRAME, validator)
    }

    pub fn show_html(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::SHOW_HTML, validator)
    }

    pub fn show_wallet_payment(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::SHOW_WALLET_PAYMENT, validator)
    }

    pub fn wait_for_customer(validator: Arc<dyn PaymentValidator>) -> Self {
        Self::new(Self::WAIT_FOR_CUSTOMER, validator)
    }

    /// All interactive states sharing one validator.
    pub fn all(validator: Arc<dyn PaymentValidator>) -> Vec<Self> {
        Self::NAMES
            .iter()
            .map(|name| Self::new(*name, validator.clone()))
            .collect()
    }

    /// The state that renders `data`.
    pub fn state_for(data: &StateData) -> &'static str {
        match data {
            StateData::Redirect { .. } => Self::REDIRECT,
            StateData::PostRedirect { .. } => Self::POST_REDIRECT,
            StateData::ShowIframe { .. } => Self::SHOW_IFRAME,
            StateData::ShowHtml { .. } => Self::SHOW_HTML,
            StateData::ShowWalletPayment(_) => Self::SHOW_WALLET_PAYMENT,
            StateData::None => Self::WAIT_FOR_CUSTOMER,
        }
    }
}

#[async_trait]
impl State for Interactive {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, process: &mut Process) -> RunResult {
        self.validator.validate(process).await
    }

    async fn rollback(&self, _data: &RollbackData) -> Result<(), RollbackError> {
        Ok(())
    }

    fn is_final(&self) -> bool {
        false
    }

    fn is_blocking(&self) -> bool {
        true
    }
}

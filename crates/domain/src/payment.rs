//! Payment flow types reported by payment gateways.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::money::Money;

/// A payment method offered by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: String,
    pub title: String,
}

impl PaymentMethod {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
        }
    }
}

/// The payment an order is placed with.
///
/// The zero-total path places orders with `Payment::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub gateway: String,
    pub payment_id: String,
    pub method: String,
    pub amount: Money,
}

impl Payment {
    /// Reference used when only gateway and payment ID are known, e.g. for cancellation.
    pub fn reference(gateway: impl Into<String>, payment_id: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            payment_id: payment_id.into(),
            ..Self::default()
        }
    }
}

/// Result of starting a gateway flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowResult {
    /// The gateway wants the order to be placed before the payment is confirmed.
    pub early_place_order: bool,
    pub status: FlowStatus,
}

/// Coarse status of a gateway flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowState {
    /// Customer interaction is required, see [`FlowStatus::action`].
    Unapproved,
    /// Payment is pending on the customer, no action the shop can render.
    WaitingForCustomer,
    /// Payment is authorized and must be confirmed once the order exists.
    Approved,
    /// Payment is done.
    Completed,
    /// The customer left the gateway flow.
    Aborted,
    /// The customer cancelled the payment.
    Cancelled,
    /// The gateway failed the payment, see [`FlowStatus::error`].
    Failed,
}

impl FlowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowState::Unapproved => "Unapproved",
            FlowState::WaitingForCustomer => "WaitingForCustomer",
            FlowState::Approved => "Approved",
            FlowState::Completed => "Completed",
            FlowState::Aborted => "Aborted",
            FlowState::Cancelled => "Cancelled",
            FlowState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single form field of a POST redirect. Repeated names keep all values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub values: Vec<String>,
}

impl FormField {
    pub fn single(value: impl Into<String>) -> Self {
        Self {
            values: vec![value.into()],
        }
    }
}

/// Browser payment request data for wallet payments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequestApi {
    pub methods: serde_json::Value,
    pub details: serde_json::Value,
    pub options: serde_json::Value,
    pub merchant_validation_url: Option<Url>,
}

/// Everything the frontend needs to show a wallet payment prompt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletDetails {
    pub used_payment_method: String,
    #[serde(default)]
    pub payment_request_api: PaymentRequestApi,
}

/// What the customer has to do for an unapproved flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FlowAction {
    Redirect {
        url: Url,
    },
    PostRedirect {
        url: Url,
        form_fields: BTreeMap<String, FormField>,
    },
    ShowIframe {
        url: Url,
    },
    ShowHtml {
        html: String,
    },
    ShowWalletPayment(WalletDetails),
}

/// Error reported by a gateway inside a flow status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowError {
    pub code: String,
    pub message: String,
}

impl FlowError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FlowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Status of a previously started gateway flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowStatus {
    pub state: FlowState,
    pub action: Option<FlowAction>,
    pub error: Option<FlowError>,
}

impl FlowStatus {
    /// A status without action or error.
    pub fn new(state: FlowState) -> Self {
        Self {
            state,
            action: None,
            error: None,
        }
    }

    /// An unapproved status asking the customer to perform `action`.
    pub fn unapproved(action: FlowAction) -> Self {
        Self {
            state: FlowState::Unapproved,
            action: Some(action),
            error: None,
        }
    }

    /// A failed status carrying the gateway error.
    pub fn failed(error: FlowError) -> Self {
        Self {
            state: FlowState::Failed,
            action: None,
            error: Some(error),
        }
    }
}

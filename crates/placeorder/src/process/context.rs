//! Serializable snapshot of one place-order saga.

use std::collections::BTreeMap;

use common::SagaId;
use domain::{Cart, FlowAction, FormField, PlaceOrderInfo, WalletDetails};
use serde::{Deserialize, Serialize};
use url::Url;

/// Data a state needs to resume after a restart.
///
/// Tagged so a reloaded context decodes back into the same variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StateData {
    #[default]
    None,
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

impl From<FlowAction> for StateData {
    fn from(action: FlowAction) -> Self {
        match action {
            FlowAction::Redirect { url } => StateData::Redirect { url },
            FlowAction::PostRedirect { url, form_fields } => {
                StateData::PostRedirect { url, form_fields }
            }
            FlowAction::ShowIframe { url } => StateData::ShowIframe { url },
            FlowAction::ShowHtml { html } => StateData::ShowHtml { html },
            FlowAction::ShowWalletPayment(details) => StateData::ShowWalletPayment(details),
        }
    }
}

/// What a step needs to undo its side effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RollbackData {
    /// A payment was opened with a gateway.
    CreatePayment { gateway: String, payment_id: String },
    /// The cart was marked as completed.
    CompleteCart { cart: Cart },
    /// Orders were created.
    PlaceOrder { order_info: PlaceOrderInfo },
}

impl RollbackData {
    /// Returns the variant name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RollbackData::CreatePayment { .. } => "CreatePayment",
            RollbackData::CompleteCart { .. } => "CompleteCart",
            RollbackData::PlaceOrder { .. } => "PlaceOrder",
        }
    }
}

/// A recorded `(state, undo data)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackReference {
    pub state_name: String,
    pub data: RollbackData,
}

/// Why a saga ended in the Failed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum FailedReason {
    /// A step failed for a reason unrelated to the payment.
    ErrorOccurred { error: String },
    /// The payment gateway reported an error.
    PaymentErrorOccurred { error: String },
    /// The customer aborted or cancelled the payment at the gateway.
    PaymentCanceledByCustomer,
    /// The saga was cancelled through the Cancel command.
    Canceled,
}

impl FailedReason {
    pub fn error_occurred(error: impl std::fmt::Display) -> Self {
        FailedReason::ErrorOccurred {
            error: error.to_string(),
        }
    }

    pub fn payment_error(error: impl std::fmt::Display) -> Self {
        FailedReason::PaymentErrorOccurred {
            error: error.to_string(),
        }
    }

    /// Human readable reason.
    pub fn reason(&self) -> String {
        match self {
            FailedReason::ErrorOccurred { error } => error.clone(),
            FailedReason::PaymentErrorOccurred { error } => error.clone(),
            FailedReason::PaymentCanceledByCustomer => "Payment canceled by customer".to_string(),
            FailedReason::Canceled => "Place order canceled".to_string(),
        }
    }
}

impl std::fmt::Display for FailedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Durable snapshot of one saga's progress.
///
/// Read access is public; every mutation goes through `Process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    id: SagaId,
    current_state_name: String,
    #[serde(default)]
    current_state_data: StateData,
    #[serde(default)]
    order_info: Option<PlaceOrderInfo>,
    cart: Cart,
    return_address: Url,
    #[serde(default)]
    rollback_references: Vec<RollbackReference>,
    #[serde(default)]
    failed_reason: Option<FailedReason>,
}

impl Context {
    /// Creates a fresh context positioned at `start_state`.
    pub fn new(
        id: SagaId,
        start_state: impl Into<String>,
        cart: Cart,
        return_address: Url,
    ) -> Self {
        Self {
            id,
            current_state_name: start_state.into(),
            current_state_data: StateData::None,
            order_info: None,
            cart,
            return_address,
            rollback_references: Vec::new(),
            failed_reason: None,
        }
    }

    pub fn id(&self) -> SagaId {
        self.id
    }

    pub fn current_state_name(&self) -> &str {
        &self.current_state_name
    }

    pub fn current_state_data(&self) -> &StateData {
        &self.current_state_data
    }

    pub fn order_info(&self) -> Option<&PlaceOrderInfo> {
        self.order_info.as_ref()
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn return_address(&self) -> &Url {
        &self.return_address
    }

    /// Rollback references in execution order.
    pub fn rollback_references(&self) -> &[RollbackReference] {
        &self.rollback_references
    }

    pub fn failed_reason(&self) -> Option<&FailedReason> {
        self.failed_reason.as_ref()
    }

    pub(crate) fn set_state(&mut self, name: &str, data: StateData) {
        self.current_state_name = name.to_string();
        self.current_state_data = data;
    }

    pub(crate) fn set_order_info(&mut self, info: PlaceOrderInfo) {
        self.order_info = Some(info);
    }

    pub(crate) fn push_rollback(&mut self, reference: RollbackReference) {
        self.rollback_references.push(reference);
    }

    pub(crate) fn set_failed_reason(&mut self, reason: FailedReason) {
        self.failed_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_store::{ContextStore, InMemoryContextStore, StoreOptions, StoredContext};
    use domain::{
        CartItem, Money, PaymentRequestApi, PaymentSelection, PlaceOrderPaymentInfo, PlacedOrder,
    };

    fn cart() -> Cart {
        Cart::new("cart-1")
            .with_item(CartItem::new("SKU-1", "Widget", 2, Money::from_cents(1250)))
            .with_payment_selection(PaymentSelection::new("fake", "payment_completed"))
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn order_info() -> PlaceOrderInfo {
        PlaceOrderInfo {
            placed_orders: vec![PlacedOrder {
                order_number: "ORD-0001".to_string(),
                delivery_code: "delivery".to_string(),
            }],
            payment_infos: vec![PlaceOrderPaymentInfo {
                gateway: "fake".to_string(),
                payment_id: "PAY-0001".to_string(),
                method: "payment_completed".to_string(),
                amount: Money::from_cents(2500),
            }],
            contact_email: Some("buyer@example.com".to_string()),
        }
    }

    fn state_data_variants() -> Vec<StateData> {
        let mut form_fields = BTreeMap::new();
        form_fields.insert("token".to_string(), FormField::single("abc"));
        form_fields.insert(
            "items".to_string(),
            FormField {
                values: vec!["1".to_string(), "2".to_string()],
            },
        );

        vec![
            StateData::None,
            StateData::Redirect {
                url: url("https://psp.example.com/redirect?id=1"),
            },
            StateData::PostRedirect {
                url: url("https://psp.example.com/post"),
                form_fields,
            },
            StateData::ShowIframe {
                url: url("https://psp.example.com/iframe"),
            },
            StateData::ShowHtml {
                html: "<form id=\"pay\"></form>".to_string(),
            },
            StateData::ShowWalletPayment(WalletDetails {
                used_payment_method: "applepay".to_string(),
                payment_request_api: PaymentRequestApi {
                    methods: serde_json::json!([{"supportedMethods": "https://apple.com/apple-pay"}]),
                    details: serde_json::json!({"total": {"amount": "25.00"}}),
                    options: serde_json::json!({}),
                    merchant_validation_url: Some(url("https://psp.example.com/validate")),
                },
            }),
        ]
    }

    fn populated_context(data: StateData) -> Context {
        let mut context = Context::new(
            SagaId::new(),
            "New",
            cart(),
            url("https://shop.example.com/checkout/return"),
        );
        context.set_state("Redirect", data);
        context.set_order_info(order_info());
        context.push_rollback(RollbackReference {
            state_name: "CreatePayment".to_string(),
            data: RollbackData::CreatePayment {
                gateway: "fake".to_string(),
                payment_id: "PAY-0001".to_string(),
            },
        });
        context.push_rollback(RollbackReference {
            state_name: "CompleteCart".to_string(),
            data: RollbackData::CompleteCart { cart: cart() },
        });
        context.push_rollback(RollbackReference {
            state_name: "PlaceOrder".to_string(),
            data: RollbackData::PlaceOrder {
                order_info: order_info(),
            },
        });
        context
    }

    #[tokio::test]
    async fn test_every_state_data_variant_survives_the_store() {
        let store = InMemoryContextStore::new();

        for (i, data) in state_data_variants().into_iter().enumerate() {
            let context = populated_context(data);
            let key = format!("session-{}", i);
            let record =
                StoredContext::from_context(context.id(), context.current_state_name(), &context)
                    .unwrap();
            store
                .store(&key, record, StoreOptions::expect_new())
                .await
                .unwrap();

            let restored: Context = store
                .get(&key)
                .await
                .unwrap()
                .unwrap()
                .into_context()
                .unwrap();
            assert_eq!(restored, context);
            assert_eq!(
                restored.current_state_data(),
                context.current_state_data()
            );
        }
    }

    #[test]
    fn test_state_data_is_type_tagged() {
        let json = serde_json::to_value(StateData::ShowHtml {
            html: "<p/>".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "ShowHtml");
        assert_eq!(json["data"]["html"], "<p/>");
    }

    #[test]
    fn test_state_data_from_flow_action() {
        let target = url("https://psp.example.com/redirect");
        let data = StateData::from(FlowAction::Redirect {
            url: target.clone(),
        });
        assert_eq!(data, StateData::Redirect { url: target });

        let data = StateData::from(FlowAction::ShowHtml {
            html: "<p/>".to_string(),
        });
        assert!(matches!(data, StateData::ShowHtml { .. }));
    }

    #[test]
    fn test_rollback_data_kind() {
        let data = RollbackData::CreatePayment {
            gateway: "test".to_string(),
            payment_id: "1234".to_string(),
        };
        assert_eq!(data.kind(), "CreatePayment");
        assert_eq!(RollbackData::CompleteCart { cart: cart() }.kind(), "CompleteCart");
    }

    #[test]
    fn test_failed_reason_text() {
        assert_eq!(
            FailedReason::payment_error("card declined").reason(),
            "card declined"
        );
        assert_eq!(
            FailedReason::PaymentCanceledByCustomer.to_string(),
            "Payment canceled by customer"
        );
        assert_eq!(FailedReason::Canceled.reason(), "Place order canceled");
    }

    #[test]
    fn test_new_context_is_clean() {
        let context = Context::new(
            SagaId::new(),
            "New",
            cart(),
            url("https://shop.example.com/return"),
        );
        assert_eq!(context.current_state_name(), "New");
        assert_eq!(context.current_state_data(), &StateData::None);
        assert!(context.order_info().is_none());
        assert!(context.rollback_references().is_empty());
        assert!(context.failed_reason().is_none());
    }
}

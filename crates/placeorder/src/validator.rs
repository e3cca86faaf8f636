//! Payment-status check shared by ValidatePayment and the interactive states.

use std::sync::Arc;

use async_trait::async_trait;
use domain::FlowState;

use crate::process::Process;
use crate::process::context::{FailedReason, StateData};
use crate::process::state::RunResult;
use crate::services::PaymentService;
use crate::states::{CompleteCart, Interactive, Success};

/// Decides the next step from the gateway's view of the payment.
///
/// Injected into every state that waits on the payment so those states can
/// be tested without a gateway.
#[async_trait]
pub trait PaymentValidator: Send + Sync {
    async fn validate(&self, process: &mut Process) -> RunResult;
}

/// Polls the cart's gateway for the flow status and maps it to a transition.
#[derive(Debug, Clone)]
pub struct GatewayPaymentValidator {
    payments: Arc<PaymentService>,
}

impl GatewayPaymentValidator {
    pub fn new(payments: Arc<PaymentService>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl PaymentValidator for GatewayPaymentValidator {
    #[tracing::instrument(skip(self, process), fields(saga_id = %process.context().id()))]
    async fn validate(&self, process: &mut Process) -> RunResult {
        let context = process.context();
        let cart = context.cart();
        let correlation_id = context.id().to_string();
        let order_placed = context.order_info().is_some();

        let gateway = match self.payments.gateway_by_cart(cart) {
            Ok(gateway) => gateway,
            Err(e) => return RunResult::failed(FailedReason::error_occurred(e)),
        };

        let status = match gateway.flow_status(cart, &correlation_id).await {
            Ok(status) => status,
            Err(e) => return RunResult::failed(FailedReason::payment_error(e)),
        };
        tracing::debug!(flow_state = %status.state, order_placed, "payment flow status");

        match status.state {
            FlowState::Unapproved => match status.action {
                Some(action) => {
                    let data = StateData::from(action);
                    let next = Interactive::state_for(&data);
                    process.update_state(next, data);
                    RunResult::ok()
                }
                None => RunResult::failed(FailedReason::payment_error(
                    "payment is unapproved but the gateway requested no action",
                )),
            },
            FlowState::WaitingForCustomer => {
                process.update_state(Interactive::WAIT_FOR_CUSTOMER, StateData::None);
                RunResult::ok()
            }
            FlowState::Approved | FlowState::Completed if !order_placed => {
                process.update_state(CompleteCart::NAME, StateData::None);
                RunResult::ok()
            }
            FlowState::Approved => {
                let payment = match gateway.order_payment_from_flow(cart, &correlation_id).await {
                    Ok(payment) => payment,
                    Err(e) => return RunResult::failed(FailedReason::payment_error(e)),
                };
                if let Err(e) = gateway.confirm_result(cart, &payment).await {
                    return RunResult::failed(FailedReason::payment_error(e));
                }
                process.update_state(Success::NAME, StateData::None);
                RunResult::ok()
            }
            FlowState::Completed => {
                process.update_state(Success::NAME, StateData::None);
                RunResult::ok()
            }
            FlowState::Aborted | FlowState::Cancelled => {
                RunResult::failed(FailedReason::PaymentCanceledByCustomer)
            }
            FlowState::Failed => {
                let error = status
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "payment failed".to_string());
                RunResult::failed(FailedReason::PaymentErrorOccurred { error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::services::PaymentGateway;
    use crate::states::test_support::{Harness, paid_cart};
    use crate::states::ValidatePayment;
    use domain::{
        FlowAction, FlowError, FlowStatus, FormField, PlaceOrderInfo, PlacedOrder, WalletDetails,
    };
    use url::Url;

    fn return_address() -> Url {
        Url::parse("https://shop.example.com/checkout/return").unwrap()
    }

    /// A process at ValidatePayment whose flow was started with `method`.
    async fn started(harness: &Harness, method: &str) -> Process {
        let process = harness.process_at(ValidatePayment::NAME, paid_cart(method));
        harness
            .gateway
            .start_flow(
                process.context().cart(),
                &process.context().id().to_string(),
                &return_address(),
            )
            .await
            .unwrap();
        process
    }

    fn validator(harness: &Harness) -> GatewayPaymentValidator {
        GatewayPaymentValidator::new(harness.services.payments.clone())
    }

    fn set_status(harness: &Harness, process: &Process, status: FlowStatus) {
        assert!(
            harness
                .gateway
                .set_flow_status(&process.context().id().to_string(), status)
        );
    }

    fn placed(process: &mut Process) {
        process.update_order_info(PlaceOrderInfo {
            placed_orders: vec![PlacedOrder {
                order_number: "ORD-0001".to_string(),
                delivery_code: "delivery".to_string(),
            }],
            payment_infos: vec![],
            contact_email: None,
        });
    }

    #[tokio::test]
    async fn test_unapproved_actions_map_to_interactive_states() {
        let harness = Harness::new();
        let wallet = WalletDetails {
            used_payment_method: "applepay".to_string(),
            ..WalletDetails::default()
        };
        let mut form_fields = BTreeMap::new();
        form_fields.insert("token".to_string(), FormField::single("t"));

        let cases = vec![
            (
                FlowAction::Redirect {
                    url: return_address(),
                },
                Interactive::REDIRECT,
            ),
            (
                FlowAction::PostRedirect {
                    url: return_address(),
                    form_fields,
                },
                Interactive::POST_REDIRECT,
            ),
            (
                FlowAction::ShowIframe {
                    url: return_address(),
                },
                Interactive::SHOW_IFRAME,
            ),
            (
                FlowAction::ShowHtml {
                    html: "<p>pay</p>".to_string(),
                },
                Interactive::SHOW_HTML,
            ),
            (
                FlowAction::ShowWalletPayment(wallet),
                Interactive::SHOW_WALLET_PAYMENT,
            ),
        ];

        for (action, expected_state) in cases {
            let mut process = started(&harness, "payment_waiting_for_customer").await;
            set_status(&harness, &process, FlowStatus::unapproved(action.clone()));

            let result = validator(&harness).validate(&mut process).await;

            assert_eq!(result, RunResult::ok());
            assert_eq!(process.context().current_state_name(), expected_state);
            assert_eq!(
                process.context().current_state_data(),
                &StateData::from(action)
            );
        }
    }

    #[tokio::test]
    async fn test_unapproved_without_action_fails() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_waiting_for_customer").await;
        set_status(&harness, &process, FlowStatus::new(FlowState::Unapproved));

        let result = validator(&harness).validate(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::PaymentErrorOccurred { .. })
        ));
    }

    #[tokio::test]
    async fn test_waiting_for_customer() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_waiting_for_customer").await;

        let result = validator(&harness).validate(&mut process).await;

        assert_eq!(result, RunResult::ok());
        assert_eq!(
            process.context().current_state_name(),
            Interactive::WAIT_FOR_CUSTOMER
        );
    }

    #[tokio::test]
    async fn test_approved_without_order_completes_cart() {
        let harness = Harness::new();
        for method in ["payment_approved", "payment_completed"] {
            let mut process = started(&harness, method).await;

            let result = validator(&harness).validate(&mut process).await;

            assert_eq!(result, RunResult::ok());
            assert_eq!(process.context().current_state_name(), CompleteCart::NAME);
        }
    }

    #[tokio::test]
    async fn test_approved_with_order_confirms_payment() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_approved").await;
        placed(&mut process);

        let result = validator(&harness).validate(&mut process).await;

        assert_eq!(result, RunResult::ok());
        assert_eq!(process.context().current_state_name(), Success::NAME);
        assert_eq!(harness.gateway.confirmed_payments(), vec!["PAY-0001"]);
    }

    #[tokio::test]
    async fn test_completed_with_order_succeeds_without_confirmation() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_completed").await;
        placed(&mut process);

        let result = validator(&harness).validate(&mut process).await;

        assert_eq!(result, RunResult::ok());
        assert_eq!(process.context().current_state_name(), Success::NAME);
        assert!(harness.gateway.confirmed_payments().is_empty());
    }

    #[tokio::test]
    async fn test_customer_cancellation() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_cancelled_by_customer").await;

        let result = validator(&harness).validate(&mut process).await;
        assert_eq!(result.failed, Some(FailedReason::PaymentCanceledByCustomer));

        set_status(&harness, &process, FlowStatus::new(FlowState::Aborted));
        let result = validator(&harness).validate(&mut process).await;
        assert_eq!(result.failed, Some(FailedReason::PaymentCanceledByCustomer));
    }

    #[tokio::test]
    async fn test_failed_flow_carries_gateway_message() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_waiting_for_customer").await;
        set_status(
            &harness,
            &process,
            FlowStatus::failed(FlowError::new("declined", "Card declined")),
        );

        let result = validator(&harness).validate(&mut process).await;

        assert_eq!(
            result.failed,
            Some(FailedReason::PaymentErrorOccurred {
                error: "Card declined".to_string()
            })
        );
        assert_eq!(process.context().current_state_name(), ValidatePayment::NAME);
    }

    #[tokio::test]
    async fn test_status_error_is_payment_error() {
        let harness = Harness::new();
        let mut process = started(&harness, "payment_error").await;

        let result = validator(&harness).validate(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::PaymentErrorOccurred { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_payment_selection() {
        let harness = Harness::new();
        let mut cart = paid_cart("payment_completed");
        cart.payment_selection = None;
        let mut process = harness.process_at(ValidatePayment::NAME, cart);

        let result = validator(&harness).validate(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::ErrorOccurred { .. })
        ));
        assert!(result.rollback_data.is_none());
    }
}

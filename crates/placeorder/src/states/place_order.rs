use std::sync::Arc;

use async_trait::async_trait;
use domain::Payment;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{FailedReason, RollbackData, StateData};
use crate::process::state::{RunResult, State, unexpected_data};
use crate::services::{OrderService, PaymentService};
use crate::states::{Success, ValidatePayment};

/// Turns the cart and its payment into orders.
///
/// Paid carts still need their payment confirmed afterwards; free carts are
/// done once the order exists.
pub struct PlaceOrder {
    payments: Arc<PaymentService>,
    orders: Arc<dyn OrderService>,
}

impl PlaceOrder {
    pub const NAME: &'static str = "PlaceOrder";

    pub fn new(payments: Arc<PaymentService>, orders: Arc<dyn OrderService>) -> Self {
        Self { payments, orders }
    }
}

#[async_trait]
impl State for PlaceOrder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, process), fields(saga_id = %process.context().id()))]
    async fn run(&self, process: &mut Process) -> RunResult {
        let context = process.context();
        let cart = context.cart();

        let Some(total) = cart.grand_total() else {
            return RunResult::failed(FailedReason::error_occurred("cart total is out of range"));
        };

        let (payment, next) = if total.is_zero() {
            (Payment::default(), Success::NAME)
        } else {
            let gateway = match self.payments.gateway_by_cart(cart) {
                Ok(gateway) => gateway,
                Err(e) => return RunResult::failed(FailedReason::payment_error(e)),
            };
            match gateway
                .order_payment_from_flow(cart, &context.id().to_string())
                .await
            {
                Ok(payment) => (payment, ValidatePayment::NAME),
                Err(e) => return RunResult::failed(FailedReason::error_occurred(e)),
            }
        };

        let info = match self.orders.place_order(cart, &payment).await {
            Ok(info) => info,
            Err(e) => return RunResult::failed(FailedReason::error_occurred(e)),
        };
        tracing::info!(
            orders = %info.order_numbers().collect::<Vec<_>>().join(","),
            "order placed"
        );

        process.update_order_info(info.clone());
        process.update_state(next, StateData::None);
        RunResult::with_rollback(RollbackData::PlaceOrder { order_info: info })
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), RollbackError> {
        let RollbackData::PlaceOrder { order_info } = data else {
            return Err(unexpected_data(Self::NAME, "PlaceOrder", data));
        };
        self.orders.cancel_order_without_restore(order_info).await?;
        Ok(())
    }

    fn is_final(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::test_support::{Harness, paid_cart, zero_total_cart};
    use domain::{Cart, PaymentSelection};
    use url::Url;

    async fn start_flow(harness: &Harness, process: &Process) {
        use crate::services::PaymentGateway;
        harness
            .gateway
            .start_flow(
                process.context().cart(),
                &process.context().id().to_string(),
                &Url::parse("https://shop.example.com/return").unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_paid_cart_places_order_and_validates_payment() {
        let harness = Harness::new();
        let mut process = harness.process_at(PlaceOrder::NAME, paid_cart("payment_approved"));
        start_flow(&harness, &process).await;

        let result = harness.place_order().run(&mut process).await;

        assert!(result.failed.is_none());
        let info = process.context().order_info().unwrap().clone();
        assert_eq!(info.order_numbers().collect::<Vec<_>>(), vec!["ORD-0001"]);
        assert_eq!(info.payment_infos[0].payment_id, "PAY-0001");
        assert_eq!(
            result.rollback_data,
            Some(RollbackData::PlaceOrder { order_info: info })
        );
        assert_eq!(process.context().current_state_name(), ValidatePayment::NAME);
    }

    #[tokio::test]
    async fn test_zero_total_goes_to_success() {
        let harness = Harness::new();
        let mut process = harness.process_at(PlaceOrder::NAME, zero_total_cart());

        let result = harness.place_order().run(&mut process).await;

        assert!(result.failed.is_none());
        let info = process.context().order_info().unwrap();
        assert!(info.payment_infos.is_empty());
        assert_eq!(process.context().current_state_name(), Success::NAME);
        assert_eq!(harness.gateway.flow_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_gateway_is_payment_error() {
        let harness = Harness::new();
        let cart = Cart {
            payment_selection: Some(PaymentSelection::new("unknown", "x")),
            ..paid_cart("payment_approved")
        };
        let mut process = harness.process_at(PlaceOrder::NAME, cart);

        let result = harness.place_order().run(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::PaymentErrorOccurred { .. })
        ));
        assert!(process.context().order_info().is_none());
    }

    #[tokio::test]
    async fn test_missing_flow_is_error_occurred() {
        let harness = Harness::new();
        let mut process = harness.process_at(PlaceOrder::NAME, paid_cart("payment_approved"));

        let result = harness.place_order().run(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::ErrorOccurred { .. })
        ));
        assert_eq!(harness.orders.order_count(), 0);
    }

    #[tokio::test]
    async fn test_order_failure_is_error_occurred() {
        let harness = Harness::new();
        harness.orders.set_fail_on_place(true);
        let mut process = harness.process_at(PlaceOrder::NAME, zero_total_cart());

        let result = harness.place_order().run(&mut process).await;

        assert!(matches!(
            result.failed,
            Some(FailedReason::ErrorOccurred { .. })
        ));
        assert!(result.rollback_data.is_none());
        assert_eq!(process.context().current_state_name(), PlaceOrder::NAME);
    }

    #[tokio::test]
    async fn test_rollback_cancels_orders() {
        let harness = Harness::new();
        let mut process = harness.process_at(PlaceOrder::NAME, zero_total_cart());
        let result = harness.place_order().run(&mut process).await;

        harness
            .place_order()
            .rollback(&result.rollback_data.unwrap())
            .await
            .unwrap();

        assert_eq!(harness.orders.cancelled_orders(), vec!["ORD-0001"]);
        assert_eq!(harness.orders.order_count(), 0);
    }

    #[tokio::test]
    async fn test_rollback_rejects_wrong_data() {
        let harness = Harness::new();
        let data = RollbackData::CompleteCart {
            cart: Cart::new("c"),
        };
        let err = harness.place_order().rollback(&data).await.unwrap_err();
        assert!(matches!(err, RollbackError::UnexpectedData { .. }));
    }
}

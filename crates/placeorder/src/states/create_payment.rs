use std::sync::Arc;

use async_trait::async_trait;
use domain::Payment;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::{FailedReason, RollbackData, StateData};
use crate::process::state::{RunResult, State, unexpected_data};
use crate::services::PaymentService;
use crate::states::{CompleteCart, ValidatePayment};

/// Starts the gateway flow and records the payment for compensation.
pub struct CreatePayment {
    payments: Arc<PaymentService>,
}

impl CreatePayment {
    pub const NAME: &'static str = "CreatePayment";

    pub fn new(payments: Arc<PaymentService>) -> Self {
        Self { payments }
    }
}

#[async_trait]
impl State for CreatePayment {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self, process), fields(saga_id = %process.context().id()))]
    async fn run(&self, process: &mut Process) -> RunResult {
        let context = process.context();
        let cart = context.cart();
        let correlation_id = context.id().to_string();

        let gateway = match self.payments.gateway_by_cart(cart) {
            Ok(gateway) => gateway,
            Err(e) => return RunResult::failed(FailedReason::error_occurred(e)),
        };

        let flow = match gateway
            .start_flow(cart, &correlation_id, context.return_address())
            .await
        {
            Ok(flow) => flow,
            Err(e) => return RunResult::failed(FailedReason::payment_error(e)),
        };

        let payment = match gateway.order_payment_from_flow(cart, &correlation_id).await {
            Ok(payment) => payment,
            Err(e) => return RunResult::failed(FailedReason::payment_error(e)),
        };
        tracing::info!(
            gateway = %payment.gateway,
            payment_id = %payment.payment_id,
            early_place_order = flow.early_place_order,
            "payment flow started"
        );

        let next = if flow.early_place_order {
            CompleteCart::NAME
        } else {
            ValidatePayment::NAME
        };
        process.update_state(next, StateData::None);

        RunResult::with_rollback(RollbackData::CreatePayment {
            gateway: payment.gateway,
            payment_id: payment.payment_id,
        })
    }

    async fn rollback(&self, data: &RollbackData) -> Result<(), RollbackError> {
        let RollbackData::CreatePayment {
            gateway,
            payment_id,
        } = data
        else {
            return Err(unexpected_data(Self::NAME, "CreatePayment", data));
        };

        let gateway_impl = self.payments.gateway(gateway)?;
        gateway_impl
            .cancel_order_payment(&Payment::reference(gateway, payment_id))
            .await?;
        tracing::info!(%gateway, %payment_id, "payment cancelled");
        Ok(())
    }

    fn is_final(&self) -> bool {
        false
    }
}

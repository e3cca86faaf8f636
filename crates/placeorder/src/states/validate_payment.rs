use std::sync::Arc;

use async_trait::async_trait;

use crate::error::RollbackError;
use crate::process::Process;
use crate::process::context::RollbackData;
use crate::process::state::{RunResult, State};
use crate::validator::PaymentValidator;

/// Checks the payment without waiting on the customer.
pub struct ValidatePayment {
    validator: Arc<dyn PaymentValidator>,
}

impl ValidatePayment {
    pub const NAME: &'static str = "ValidatePayment";

    pub fn new(validator: Arc<dyn PaymentValidator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl State for ValidatePayment {
    fn name(&self) -> &'static str {
        Self::NAME
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
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::process::context::FailedReason;
    use crate::states::test_support::{StubValidator, process_in};

    #[tokio::test]
    async fn test_run_delegates_to_validator() {
        let validator = Arc::new(StubValidator::failing(FailedReason::PaymentCanceledByCustomer));
        let state = ValidatePayment::new(validator.clone());
        let mut process = process_in(ValidatePayment::NAME);

        let result = state.run(&mut process).await;

        assert_eq!(result.failed, Some(FailedReason::PaymentCanceledByCustomer));
        assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rollback_is_noop() {
        let state = ValidatePayment::new(Arc::new(StubValidator::default()));
        let data = RollbackData::CreatePayment {
            gateway: "test".to_string(),
            payment_id: "1234".to_string(),
        };
        assert!(state.rollback(&data).await.is_ok());
        assert!(!state.is_final());
        assert!(!state.is_blocking());
    }
}

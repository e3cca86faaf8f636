//! The place-order state vocabulary and its default wiring.

pub mod complete_cart;
pub mod create_payment;
pub mod interactive;
pub mod new;
pub mod place_order;
pub mod terminal;
pub mod validate_payment;

use std::sync::Arc;

pub use complete_cart::CompleteCart;
pub use create_payment::CreatePayment;
pub use interactive::Interactive;
pub use new::New;
pub use place_order::PlaceOrder;
pub use terminal::{Failed, Success};
pub use validate_payment::ValidatePayment;

use crate::error::RegistryError;
use crate::process::registry::StateRegistry;
use crate::services::{CartService, OrderService, PaymentService};
use crate::validator::{GatewayPaymentValidator, PaymentValidator};

/// Collaborators the default states depend on.
#[derive(Clone)]
pub struct PlaceOrderServices {
    pub payments: Arc<PaymentService>,
    pub orders: Arc<dyn OrderService>,
    pub carts: Arc<dyn CartService>,
    pub validator: Arc<dyn PaymentValidator>,
}

impl PlaceOrderServices {
    /// Wires the services with a [`GatewayPaymentValidator`] over `payments`.
    pub fn new(
        payments: Arc<PaymentService>,
        orders: Arc<dyn OrderService>,
        carts: Arc<dyn CartService>,
    ) -> Self {
        let validator: Arc<dyn PaymentValidator> =
            Arc::new(GatewayPaymentValidator::new(payments.clone()));
        Self {
            payments,
            orders,
            carts,
            validator,
        }
    }

    /// Replaces the payment validator.
    pub fn with_validator(mut self, validator: Arc<dyn PaymentValidator>) -> Self {
        self.validator = validator;
        self
    }
}

/// Builds the registry with every place-order state.
pub fn default_registry(services: &PlaceOrderServices) -> Result<StateRegistry, RegistryError> {
    let mut builder = StateRegistry::builder()
        .register(New)
        .register(CreatePayment::new(services.payments.clone()))
        .register(ValidatePayment::new(services.validator.clone()))
        .register(CompleteCart::new(services.carts.clone()))
        .register(PlaceOrder::new(
            services.payments.clone(),
            services.orders.clone(),
        ))
        .register(Success)
        .register(Failed);

    for state in Interactive::all(services.validator.clone()) {
        builder = builder.register(state);
    }

    builder
        .start_state(New::NAME)
        .failed_state(Failed::NAME)
        .build()
}

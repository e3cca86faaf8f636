//! Persistent place-order saga.
//!
//! A checkout is driven through a fixed set of named states:
//! 1. New: skip payment for a zero total cart
//! 2. CreatePayment: start the gateway flow
//! 3. ValidatePayment and the interactive states: wait for the customer
//!    and the gateway to settle the payment
//! 4. CompleteCart, PlaceOrder: turn the cart into orders
//! 5. Success or Failed
//!
//! Every step that changes something outside the saga records rollback
//! data. When a step fails, or the caller cancels, the recorded steps are
//! undone in reverse order.
//!
//! The saga context is persisted after every step, so a saga waiting on the
//! customer can be resumed later by another process.

pub mod commands;
pub mod coordinator;
pub mod error;
pub mod factory;
mod locks;
pub mod process;
pub mod services;
pub mod states;
pub mod validator;

pub use commands::{PlaceOrderStatus, StartPlaceOrder};
pub use coordinator::{CoordinatorConfig, PlaceOrderCoordinator};
pub use error::{
    CartServiceError, CompensationError, CompensationFailure, GatewayError, OrderServiceError,
    PaymentServiceError, PlaceOrderError, RegistryError, Result, RollbackError,
};
pub use factory::ProcessFactory;
pub use process::Process;
pub use process::context::{Context, FailedReason, RollbackData, RollbackReference, StateData};
pub use process::registry::{StateRegistry, StateRegistryBuilder};
pub use process::state::{RunResult, State};
pub use services::{
    CartService, FAKE_GATEWAY_CODE, FakePaymentGateway, InMemoryCartService, InMemoryOrderService,
    OrderService, PaymentGateway, PaymentService,
};
pub use states::{PlaceOrderServices, default_registry};
pub use validator::{GatewayPaymentValidator, PaymentValidator};

//! External collaborator ports and in-memory implementations.

pub mod cart;
pub mod fake_gateway;
pub mod order;
pub mod payment;

pub use cart::{CartService, InMemoryCartService};
pub use fake_gateway::{FAKE_GATEWAY_CODE, FakePaymentGateway};
pub use order::{InMemoryOrderService, OrderService};
pub use payment::{PaymentGateway, PaymentService};

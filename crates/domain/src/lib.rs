//! Value types the place-order saga exchanges with its collaborators.
//!
//! The cart aggregate, the payment gateways and the order service live outside
//! the saga engine. This crate only carries the shapes that cross those
//! boundaries:
//! - `Cart` snapshot taken when a saga starts
//! - payment flow results and statuses reported by a gateway
//! - order information returned once an order has been placed

pub mod cart;
pub mod money;
pub mod order;
pub mod payment;

pub use cart::{Cart, CartItem, PaymentSelection, ProductId};
pub use money::Money;
pub use order::{PlaceOrderInfo, PlaceOrderPaymentInfo, PlacedOrder};
pub use payment::{
    FlowAction, FlowError, FlowResult, FlowState, FlowStatus, FormField, Payment, PaymentMethod,
    PaymentRequestApi, WalletDetails,
};

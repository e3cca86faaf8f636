//! Information about placed orders.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// One order created by the order service. A cart with several deliveries
/// can end up as several orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_number: String,
    pub delivery_code: String,
}

/// The payment an order was placed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderPaymentInfo {
    pub gateway: String,
    pub payment_id: String,
    pub method: String,
    pub amount: Money,
}

/// Result of a successful order creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrderInfo {
    pub placed_orders: Vec<PlacedOrder>,
    pub payment_infos: Vec<PlaceOrderPaymentInfo>,
    pub contact_email: Option<String>,
}

impl PlaceOrderInfo {
    /// Returns the order numbers of all placed orders.
    pub fn order_numbers(&self) -> impl Iterator<Item = &str> {
        self.placed_orders.iter().map(|o| o.order_number.as_str())
    }
}

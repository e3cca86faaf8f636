//! Order service port and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use domain::{Cart, Payment, PlaceOrderInfo, PlaceOrderPaymentInfo, PlacedOrder};

use crate::error::OrderServiceError;

/// Creates orders from carts.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Places the cart as one or more orders paid with `payment`.
    async fn place_order(
        &self,
        cart: &Cart,
        payment: &Payment,
    ) -> Result<PlaceOrderInfo, OrderServiceError>;

    /// Best-effort cancel that leaves the cart alone.
    async fn cancel_order_without_restore(
        &self,
        info: &PlaceOrderInfo,
    ) -> Result<(), OrderServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<String, String>,
    cancelled: Vec<String>,
    next_id: u32,
    fail_on_place: bool,
    fail_on_cancel: bool,
}

/// In-memory order service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderService {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderService {
    /// Creates a new in-memory order service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail on place order calls.
    pub fn set_fail_on_place(&self, fail: bool) {
        self.write().fail_on_place = fail;
    }

    /// Configures the service to fail on cancel calls.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
    }

    /// Returns the number of open (not cancelled) orders.
    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }

    /// Returns true if an open order exists with the given number.
    pub fn has_order(&self, order_number: &str) -> bool {
        self.read().orders.contains_key(order_number)
    }

    /// Order numbers cancelled so far.
    pub fn cancelled_orders(&self) -> Vec<String> {
        self.read().cancelled.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryOrderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryOrderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn place_order(
        &self,
        cart: &Cart,
        payment: &Payment,
    ) -> Result<PlaceOrderInfo, OrderServiceError> {
        let mut state = self.write();

        if state.fail_on_place {
            return Err(OrderServiceError::PlacementFailed(format!(
                "cart {} rejected",
                cart.id
            )));
        }

        state.next_id += 1;
        let order_number = format!("ORD-{:04}", state.next_id);
        state.orders.insert(order_number.clone(), cart.id.clone());

        // Zero-total carts are placed without a payment
        let payment_infos = if payment.payment_id.is_empty() {
            Vec::new()
        } else {
            vec![PlaceOrderPaymentInfo {
                gateway: payment.gateway.clone(),
                payment_id: payment.payment_id.clone(),
                method: payment.method.clone(),
                amount: payment.amount,
            }]
        };

        Ok(PlaceOrderInfo {
            placed_orders: vec![PlacedOrder {
                order_number,
                delivery_code: "delivery".to_string(),
            }],
            payment_infos,
            contact_email: cart.contact_email.clone(),
        })
    }

    async fn cancel_order_without_restore(
        &self,
        info: &PlaceOrderInfo,
    ) -> Result<(), OrderServiceError> {
        let mut state = self.write();

        if state.fail_on_cancel {
            return Err(OrderServiceError::CancellationFailed(
                info.order_numbers().collect::<Vec<_>>().join(", "),
            ));
        }

        for order_number in info.order_numbers() {
            state.orders.remove(order_number);
            state.cancelled.push(order_number.to_string());
        }
        Ok(())
    }
}

//! Cart service port and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use domain::Cart;

use crate::error::CartServiceError;

/// Finalizes carts before they become orders.
#[async_trait]
pub trait CartService: Send + Sync {
    /// Marks the cart as completed so it can no longer be changed.
    async fn complete_cart(&self, cart: &Cart) -> Result<Cart, CartServiceError>;

    /// Reopens a completed cart.
    async fn restore_cart(&self, cart: &Cart) -> Result<Cart, CartServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryCartState {
    completed: HashSet<String>,
    restored: Vec<String>,
    fail_on_complete: bool,
    fail_on_restore: bool,
}

/// In-memory cart service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartService {
    state: Arc<RwLock<InMemoryCartState>>,
}

impl InMemoryCartService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_complete(&self, fail: bool) {
        self.write().fail_on_complete = fail;
    }

    pub fn set_fail_on_restore(&self, fail: bool) {
        self.write().fail_on_restore = fail;
    }

    /// Returns true if the cart is currently completed.
    pub fn is_completed(&self, cart_id: &str) -> bool {
        self.read().completed.contains(cart_id)
    }

    /// IDs of restored carts, in restore order.
    pub fn restored_carts(&self) -> Vec<String> {
        self.read().restored.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryCartState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryCartState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CartService for InMemoryCartService {
    async fn complete_cart(&self, cart: &Cart) -> Result<Cart, CartServiceError> {
        let mut state = self.write();
        if state.fail_on_complete {
            return Err(CartServiceError::CompletionFailed(cart.id.clone()));
        }
        state.completed.insert(cart.id.clone());
        Ok(cart.clone())
    }

    async fn restore_cart(&self, cart: &Cart) -> Result<Cart, CartServiceError> {
        let mut state = self.write();
        if state.fail_on_restore {
            return Err(CartServiceError::RestoreFailed(cart.id.clone()));
        }
        state.completed.remove(&cart.id);
        state.restored.push(cart.id.clone());
        Ok(cart.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_and_restore() {
        let service = InMemoryCartService::new();
        let cart = Cart::new("cart-1");

        service.complete_cart(&cart).await.unwrap();
        assert!(service.is_completed("cart-1"));

        service.restore_cart(&cart).await.unwrap();
        assert!(!service.is_completed("cart-1"));
        assert_eq!(service.restored_carts(), vec!["cart-1"]);
    }

    #[tokio::test]
    async fn test_fail_switches() {
        let service = InMemoryCartService::new();
        let cart = Cart::new("cart-1");

        service.set_fail_on_complete(true);
        assert!(service.complete_cart(&cart).await.is_err());
        assert!(!service.is_completed("cart-1"));

        service.set_fail_on_restore(true);
        assert!(service.restore_cart(&cart).await.is_err());
        assert!(service.restored_carts().is_empty());
    }
}

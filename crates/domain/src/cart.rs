//! Cart snapshot handed to the saga when it starts.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    /// Creates a new cart item.
    pub fn new(
        product_id: impl Into<ProductId>,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns quantity * unit price, or `None` if it does not fit.
    pub fn row_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// The gateway and method the customer picked for paying the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSelection {
    /// Code of the payment gateway, used to look it up in the payment service.
    pub gateway: String,
    /// Gateway specific payment method code.
    pub method: String,
}

impl PaymentSelection {
    pub fn new(gateway: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            gateway: gateway.into(),
            method: method.into(),
        }
    }
}

/// Immutable cart snapshot.
///
/// Pricing and tax rules live with the cart aggregate; the saga only reads
/// the grand total and the payment selection from this copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub payment_selection: Option<PaymentSelection>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl Cart {
    /// Creates an empty cart with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Adds an item (builder style).
    pub fn with_item(mut self, item: CartItem) -> Self {
        self.items.push(item);
        self
    }

    /// Sets the payment selection (builder style).
    pub fn with_payment_selection(mut self, selection: PaymentSelection) -> Self {
        self.payment_selection = Some(selection);
        self
    }

    /// Sets the contact email (builder style).
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Returns the sum of all row totals.
    ///
    /// `None` when a row or the sum overflows; such a cart cannot be priced.
    pub fn grand_total(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::zero(), |total, item| {
            total.checked_add(item.row_total()?)
        })
    }

    /// Returns true if the cart has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grand_total() {
        let cart = Cart::new("cart-1")
            .with_item(CartItem::new("SKU-001", "Widget", 2, Money::from_cents(1000)))
            .with_item(CartItem::new("SKU-002", "Gadget", 1, Money::from_cents(2500)));

        assert_eq!(cart.grand_total(), Some(Money::from_cents(4500)));
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_free_items_have_zero_total() {
        let cart = Cart::new("cart-1").with_item(CartItem::new("GIFT", "Gift", 3, Money::zero()));
        assert!(cart.grand_total().unwrap().is_zero());
    }

    #[test]
    fn test_overflowing_total_is_none() {
        let cart = Cart::new("cart-1").with_item(CartItem::new(
            "SKU-001",
            "Widget",
            4,
            Money::from_cents(1 << 62),
        ));
        assert_eq!(cart.grand_total(), None);

        let cart = Cart::new("cart-2")
            .with_item(CartItem::new("SKU-001", "Widget", 1, Money::from_cents(i64::MAX)))
            .with_item(CartItem::new("SKU-002", "Gadget", 1, Money::from_cents(1)));
        assert_eq!(cart.grand_total(), None);
    }

    #[test]
    fn test_deserializes_without_optional_fields() {
        let cart: Cart = serde_json::from_str(r#"{"id":"cart-9"}"#).unwrap();
        assert_eq!(cart.id, "cart-9");
        assert!(cart.is_empty());
        assert!(cart.payment_selection.is_none());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let cart = Cart::new("cart-2")
            .with_item(CartItem::new("SKU-001", "Widget", 1, Money::from_cents(999)))
            .with_payment_selection(PaymentSelection::new("test", "card"))
            .with_contact_email("max@example.org");

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
    }
}

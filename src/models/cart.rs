use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::OrderId;
use super::product::ProductId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Parent product id; for variations this is the variable product.
    pub product_id: ProductId,
    #[serde(default)]
    pub variation_id: Option<ProductId>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// Numeric cart total including shipping and taxes.
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Error,
    Notice,
    Success,
}

/// Buyer-facing message raised while handling a checkout request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Per-request checkout context: the buyer's cart, the order-pay target if
/// the request comes from an order-pay page, and the side effects raised
/// while handling it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub cart: Option<Cart>,
    #[serde(default)]
    pub order_pay: Option<OrderId>,
    #[serde(skip_deserializing)]
    notices: Vec<Notice>,
    #[serde(skip_deserializing)]
    cart_cleared: bool,
}

impl CheckoutSession {
    pub fn with_cart(cart: Cart) -> Self {
        Self {
            cart: Some(cart),
            ..Self::default()
        }
    }

    pub fn for_order_pay(order_id: OrderId) -> Self {
        Self {
            order_pay: Some(order_id),
            ..Self::default()
        }
    }

    /// An order-pay request needs a positive order id.
    pub fn order_pay_target(&self) -> Option<OrderId> {
        self.order_pay.filter(|id| id.0 > 0)
    }

    pub fn is_order_pay(&self) -> bool {
        self.order_pay_target().is_some()
    }

    pub fn add_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn clear_cart(&mut self) {
        if let Some(cart) = self.cart.as_mut() {
            cart.items.clear();
            cart.total = Decimal::ZERO;
        }
        self.cart_cleared = true;
    }

    pub fn cart_cleared(&self) -> bool {
        self.cart_cleared
    }
}

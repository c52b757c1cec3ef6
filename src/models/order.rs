use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use validator::Validate;

use super::product::ProductId;
use super::subscription::SubscriptionId;

/// Metadata key under which the voucher payer-action URL is stored on an order.
pub const PAYER_ACTION_META_KEY: &str = "ppcp_oxxo_payer_action";

/// Host-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Enum representing the possible statuses of an order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OrderStatus {
    PendingPayment,
    OnHold,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl OrderStatus {
    /// `completed` and `failed` are never left by an automatic transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }
}

/// A single purchased line on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default = "default_physical")]
    pub is_physical: bool,
}

fn default_physical() -> bool {
    true
}

impl LineItem {
    pub fn new(product_id: ProductId, name: impl Into<String>, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            unit_price,
            is_physical: true,
        }
    }

    pub fn digital(mut self) -> Self {
        self.is_physical = false;
        self
    }

    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Buyer billing contact as captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct BillingContact {
    pub first_name: String,
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 2))]
    pub country_code: String,
}

impl BillingContact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Human-readable note attached on status changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderNote {
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// An order as held by the host store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub currency: String,
    pub total: Decimal,
    pub items: Vec<LineItem>,
    pub billing: BillingContact,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub transaction_id: Option<String>,
    /// Set on renewal orders minted for a subscription.
    pub subscription_id: Option<SubscriptionId>,
    #[serde(default)]
    pub notes: Vec<OrderNote>,
    /// Bumped on every mutation; the store compares it on status writes.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn payer_action_url(&self) -> Option<&str> {
        self.meta(PAYER_ACTION_META_KEY)
    }

    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(LineItem::subtotal).sum()
    }

    pub fn last_note(&self) -> Option<&str> {
        self.notes.last().map(|note| note.message.as_str())
    }
}

/// Order data before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub currency: String,
    pub total: Decimal,
    pub items: Vec<LineItem>,
    pub billing: BillingContact,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub subscription_id: Option<SubscriptionId>,
}

impl NewOrder {
    /// Builds a checkout order whose total is the sum of its lines.
    pub fn new(currency: impl Into<String>, items: Vec<LineItem>, billing: BillingContact) -> Self {
        let total = items.iter().map(LineItem::subtotal).sum();
        Self {
            currency: currency.into(),
            total,
            items,
            billing,
            metadata: BTreeMap::new(),
            subscription_id: None,
        }
    }

    /// Overrides the total, e.g. when shipping or discounts apply.
    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    pub fn into_order(self, id: OrderId) -> Order {
        Order {
            id,
            status: OrderStatus::PendingPayment,
            currency: self.currency,
            total: self.total,
            items: self.items,
            billing: self.billing,
            metadata: self.metadata,
            transaction_id: None,
            subscription_id: self.subscription_id,
            notes: Vec::new(),
            version: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }
}

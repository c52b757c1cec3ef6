use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::order::{BillingContact, LineItem, NewOrder, OrderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SubscriptionStatus {
    Active,
    OnHold,
    Cancelled,
    Expired,
}

/// A recurring agreement. The billing agreement id is written once when the
/// initiating order is created and is only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub billing_agreement_id: Option<String>,
    pub status: SubscriptionStatus,
    pub parent_order_id: Option<OrderId>,
    pub currency: String,
    pub total: Decimal,
    pub items: Vec<LineItem>,
    pub billing: BillingContact,
    /// Renewal schedule, opaque to this crate.
    #[serde(default)]
    pub schedule: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Draft of the next renewal order, copied from the subscription's template.
    pub fn renewal_order(&self) -> NewOrder {
        NewOrder {
            currency: self.currency.clone(),
            total: self.total,
            items: self.items.clone(),
            billing: self.billing.clone(),
            metadata: BTreeMap::new(),
            subscription_id: Some(self.id),
        }
    }
}

/// Subscription data before the store assigns an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub billing_agreement_id: Option<String>,
    pub parent_order_id: Option<OrderId>,
    pub currency: String,
    pub items: Vec<LineItem>,
    pub billing: BillingContact,
}

impl NewSubscription {
    pub fn into_subscription(self, id: SubscriptionId) -> Subscription {
        let total = self.items.iter().map(LineItem::subtotal).sum();
        Subscription {
            id,
            billing_agreement_id: self.billing_agreement_id,
            status: SubscriptionStatus::Active,
            parent_order_id: self.parent_order_id,
            currency: self.currency,
            total,
            items: self.items,
            billing: self.billing,
            schedule: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }
}

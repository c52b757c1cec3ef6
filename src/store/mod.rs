/*!
 * # Correlation Store
 *
 * Storage contracts for the host's orders, subscriptions and catalog. The
 * host store is the system of record; this crate only needs key lookups,
 * compare-and-set on order status and insert-if-absent for renewal orders.
 */

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    NewOrder, Order, OrderId, OrderStatus, Product, ProductId, Subscription, SubscriptionId,
};

pub mod memory;

pub use memory::InMemoryStore;

/// Store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result of a compare-and-set on an order's status.
#[derive(Debug, Clone, PartialEq)]
pub enum CasOutcome {
    Applied(Order),
    /// The stored version moved on; carries the current record.
    Stale(Order),
}

/// Result of creating a renewal order keyed on (subscription, transaction id).
#[derive(Debug, Clone, PartialEq)]
pub enum RenewalInsert {
    Created(Order),
    Existing(Order),
}

impl RenewalInsert {
    pub fn order(&self) -> &Order {
        match self {
            RenewalInsert::Created(order) | RenewalInsert::Existing(order) => order,
        }
    }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn create(&self, draft: NewOrder) -> Result<Order, StoreError>;

    /// Creates a renewal order unless one already exists for the same
    /// subscription and transaction id. Without a transaction id there is
    /// nothing to deduplicate on and a new order is always created.
    async fn create_renewal(
        &self,
        draft: NewOrder,
        subscription_id: SubscriptionId,
        transaction_id: Option<&str>,
    ) -> Result<RenewalInsert, StoreError>;

    /// Writes `status` only if the stored version still equals
    /// `expected_version`. A note, when given, is appended in the same write.
    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected_version: u64,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<CasOutcome, StoreError>;

    async fn set_meta(&self, id: OrderId, key: &str, value: &str) -> Result<Order, StoreError>;

    async fn set_transaction_id(&self, id: OrderId, transaction_id: &str)
        -> Result<Order, StoreError>;

    async fn renewals_for(&self, subscription_id: SubscriptionId) -> Result<Vec<Order>, StoreError>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// All subscriptions whose stored billing agreement id equals `billing_agreement_id`.
    async fn find_by_billing_agreement(
        &self,
        billing_agreement_id: &str,
    ) -> Result<Vec<Subscription>, StoreError>;
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

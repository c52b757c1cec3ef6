use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::{
    CasOutcome, OrderRepository, ProductCatalog, RenewalInsert, StoreError,
    SubscriptionRepository,
};
use crate::models::{
    NewOrder, NewSubscription, Order, OrderId, OrderNote, OrderStatus, Product, ProductId,
    Subscription, SubscriptionId,
};

/// In-memory store backing all three repositories.
///
/// Entry locks give the per-record serialization the host database would
/// provide with row locks.
#[derive(Debug)]
pub struct InMemoryStore {
    orders: DashMap<OrderId, Order>,
    renewals: DashMap<(SubscriptionId, String), OrderId>,
    subscriptions: DashMap<SubscriptionId, Subscription>,
    products: DashMap<ProductId, Product>,
    next_order_id: AtomicU64,
    next_subscription_id: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            orders: DashMap::new(),
            renewals: DashMap::new(),
            subscriptions: DashMap::new(),
            products: DashMap::new(),
            next_order_id: AtomicU64::new(1),
            next_subscription_id: AtomicU64::new(1),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(&self, draft: NewSubscription) -> Subscription {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::SeqCst));
        let subscription = draft.into_subscription(id);
        self.subscriptions.insert(id, subscription.clone());
        subscription
    }

    pub fn add_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    fn insert_order(&self, draft: NewOrder) -> Order {
        let id = OrderId(self.next_order_id.fetch_add(1, Ordering::SeqCst));
        let order = draft.into_order(id);
        self.orders.insert(id, order.clone());
        order
    }

    fn mutate<F>(&self, id: OrderId, f: F) -> Result<Order, StoreError>
    where
        F: FnOnce(&mut Order),
    {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;
        f(entry.value_mut());
        entry.version += 1;
        entry.updated_at = Some(Utc::now());
        Ok(entry.clone())
    }
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(&id).map(|entry| entry.clone()))
    }

    async fn create(&self, draft: NewOrder) -> Result<Order, StoreError> {
        Ok(self.insert_order(draft))
    }

    async fn create_renewal(
        &self,
        draft: NewOrder,
        subscription_id: SubscriptionId,
        transaction_id: Option<&str>,
    ) -> Result<RenewalInsert, StoreError> {
        let Some(transaction_id) = transaction_id else {
            return Ok(RenewalInsert::Created(self.insert_order(draft)));
        };

        match self
            .renewals
            .entry((subscription_id, transaction_id.to_string()))
        {
            Entry::Occupied(existing) => {
                let order_id = *existing.get();
                debug!(%order_id, %subscription_id, transaction_id, "renewal already recorded");
                self.orders
                    .get(&order_id)
                    .map(|order| RenewalInsert::Existing(order.clone()))
                    .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))
            }
            Entry::Vacant(slot) => {
                let order = self.insert_order(draft);
                slot.insert(order.id);
                Ok(RenewalInsert::Created(order))
            }
        }
    }

    async fn compare_and_set_status(
        &self,
        id: OrderId,
        expected_version: u64,
        status: OrderStatus,
        note: Option<String>,
    ) -> Result<CasOutcome, StoreError> {
        let mut entry = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {}", id)))?;

        if entry.version != expected_version {
            return Ok(CasOutcome::Stale(entry.clone()));
        }

        let now = Utc::now();
        entry.status = status;
        if let Some(message) = note {
            entry.notes.push(OrderNote {
                created_at: now,
                message,
            });
        }
        entry.version += 1;
        entry.updated_at = Some(now);
        Ok(CasOutcome::Applied(entry.clone()))
    }

    async fn set_meta(&self, id: OrderId, key: &str, value: &str) -> Result<Order, StoreError> {
        self.mutate(id, |order| {
            order.metadata.insert(key.to_string(), value.to_string());
        })
    }

    async fn set_transaction_id(
        &self,
        id: OrderId,
        transaction_id: &str,
    ) -> Result<Order, StoreError> {
        self.mutate(id, |order| {
            order.transaction_id = Some(transaction_id.to_string());
        })
    }

    async fn renewals_for(&self, subscription_id: SubscriptionId) -> Result<Vec<Order>, StoreError> {
        let mut renewals: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.subscription_id == Some(subscription_id))
            .map(|entry| entry.clone())
            .collect();
        renewals.sort_by_key(|order| order.id);
        Ok(renewals)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find_by_billing_agreement(
        &self,
        billing_agreement_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        let mut matches: Vec<Subscription> = self
            .subscriptions
            .iter()
            .filter(|entry| entry.billing_agreement_id.as_deref() == Some(billing_agreement_id))
            .map(|entry| entry.clone())
            .collect();
        matches.sort_by_key(|subscription| subscription.id);
        Ok(matches)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&id).map(|entry| entry.clone()))
    }
}

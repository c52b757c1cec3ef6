use tracing::{debug, warn};

use crate::models::{Order, OrderId};
use crate::store::{OrderRepository, StoreError};

/// What recording a processor transaction id did to the order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionIdRecord {
    Recorded(Order),
    /// The order already carried this id; nothing was written.
    Unchanged,
    Replaced { previous: String, order: Order },
    /// Blank ids are ignored.
    Skipped,
}

/// Stores the processor transaction id on an order.
///
/// Shared by the checkout and webhook paths. Writing the same id twice is a
/// no-op.
pub async fn record_transaction_id(
    orders: &dyn OrderRepository,
    order_id: OrderId,
    transaction_id: &str,
) -> Result<TransactionIdRecord, StoreError> {
    let transaction_id = transaction_id.trim();
    if transaction_id.is_empty() {
        return Ok(TransactionIdRecord::Skipped);
    }

    let order = orders
        .get(order_id)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("order {}", order_id)))?;

    match order.transaction_id {
        Some(ref current) if current == transaction_id => {
            debug!(%order_id, transaction_id, "transaction id already recorded");
            Ok(TransactionIdRecord::Unchanged)
        }
        Some(previous) => {
            warn!(%order_id, %previous, transaction_id, "replacing transaction id");
            let order = orders.set_transaction_id(order_id, transaction_id).await?;
            Ok(TransactionIdRecord::Replaced { previous, order })
        }
        None => {
            let order = orders.set_transaction_id(order_id, transaction_id).await?;
            Ok(TransactionIdRecord::Recorded(order))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingContact, NewOrder};
    use crate::store::InMemoryStore;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn records_once_then_no_ops() {
        let store = InMemoryStore::new();
        let order = store
            .create(NewOrder::new("USD", vec![], BillingContact::default()))
            .await
            .unwrap();

        let first = record_transaction_id(&store, order.id, "TX-1").await.unwrap();
        assert_matches!(first, TransactionIdRecord::Recorded(ref o) if o.transaction_id.as_deref() == Some("TX-1"));

        let second = record_transaction_id(&store, order.id, "TX-1").await.unwrap();
        assert_eq!(second, TransactionIdRecord::Unchanged);

        let third = record_transaction_id(&store, order.id, "TX-2").await.unwrap();
        assert_matches!(third, TransactionIdRecord::Replaced { ref previous, .. } if previous == "TX-1");

        assert_eq!(
            record_transaction_id(&store, order.id, "  ").await.unwrap(),
            TransactionIdRecord::Skipped
        );
    }

    #[tokio::test]
    async fn missing_order_is_reported() {
        let store = InMemoryStore::new();
        assert_matches!(
            record_transaction_id(&store, OrderId(77), "TX").await,
            Err(StoreError::NotFound(_))
        );
    }
}

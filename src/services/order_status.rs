use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    models::{Order, OrderId, OrderStatus},
    services::transaction_id::{record_transaction_id, TransactionIdRecord},
    store::{CasOutcome, OrderRepository},
};

/// Rejected status changes
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot transition order from '{from}' to '{to}'")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order is already '{current}' and cannot become '{requested}'")]
    ConflictingTerminal {
        current: OrderStatus,
        requested: OrderStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied { from: OrderStatus, to: OrderStatus },
    /// The order already was in the requested state.
    Unchanged(OrderStatus),
}

/// Result of a persisted status request.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub order: Order,
    pub outcome: TransitionOutcome,
}

fn allowed_targets(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::*;
    match from {
        PendingPayment => &[OnHold, Processing, Cancelled],
        OnHold => &[Completed, Failed, Processing, Cancelled],
        Processing => &[Completed, Failed],
        Failed => &[PendingPayment],
        Completed | Cancelled => &[],
    }
}

/// Checks a requested status change against the order lifecycle.
pub fn check_transition(
    from: OrderStatus,
    to: OrderStatus,
) -> Result<TransitionOutcome, TransitionError> {
    if from == to {
        return Ok(TransitionOutcome::Unchanged(from));
    }
    if from.is_terminal() && to.is_terminal() {
        return Err(TransitionError::ConflictingTerminal {
            current: from,
            requested: to,
        });
    }
    if allowed_targets(from).contains(&to) {
        Ok(TransitionOutcome::Applied { from, to })
    } else {
        Err(TransitionError::InvalidTransition { from, to })
    }
}

/// Applies order status changes through compare-and-set on the order version.
#[derive(Clone)]
pub struct OrderStatusService {
    orders: Arc<dyn OrderRepository>,
}

impl OrderStatusService {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }

    async fn load(&self, order_id: OrderId) -> Result<Order, ServiceError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    pub async fn get_status(&self, order_id: OrderId) -> Result<OrderStatus, ServiceError> {
        Ok(self.load(order_id).await?.status)
    }

    /// Moves an order to `to`, appending `note` when the status actually changes.
    ///
    /// `failed -> pending-payment` is reserved for [`Self::retry`].
    #[instrument(skip(self, note), fields(order_id = %order_id, to = %to))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<StatusChange, ServiceError> {
        if to == OrderStatus::PendingPayment {
            let current = self.load(order_id).await?;
            if current.status == OrderStatus::Failed {
                return Err(TransitionError::InvalidTransition {
                    from: current.status,
                    to,
                }
                .into());
            }
        }
        self.apply(order_id, to, note).await
    }

    /// Manual reset of a failed order so the buyer can pay again.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn retry(&self, order_id: OrderId) -> Result<StatusChange, ServiceError> {
        let order = self.load(order_id).await?;
        if order.status != OrderStatus::Failed {
            return Err(ServiceError::InvalidOperation(format!(
                "Only failed orders can be retried; order {} is '{}'",
                order_id, order.status
            )));
        }
        self.apply(
            order_id,
            OrderStatus::PendingPayment,
            Some("Payment retry requested.".to_string()),
        )
        .await
    }

    /// Marks a paid order as processing and records the processor transaction id.
    ///
    /// Repeated calls are harmless: an order already processing or completed
    /// is left as is.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn payment_complete(
        &self,
        order_id: OrderId,
        transaction_id: Option<&str>,
    ) -> Result<Order, ServiceError> {
        let order = self.load(order_id).await?;

        let mut order = match order.status {
            OrderStatus::Processing | OrderStatus::Completed => order,
            _ => {
                self.apply(
                    order_id,
                    OrderStatus::Processing,
                    Some("Payment completed.".to_string()),
                )
                .await?
                .order
            }
        };

        if let Some(transaction_id) = transaction_id {
            if let TransactionIdRecord::Recorded(updated)
            | TransactionIdRecord::Replaced { order: updated, .. } =
                record_transaction_id(self.orders.as_ref(), order_id, transaction_id).await?
            {
                order = updated;
            }
        }

        Ok(order)
    }

    async fn apply(
        &self,
        order_id: OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<StatusChange, ServiceError> {
        let mut current = self.load(order_id).await?;

        // One re-read after a lost race; concurrent duplicates then see Unchanged.
        for attempt in 0..2 {
            let outcome = match check_transition(current.status, to) {
                Ok(outcome) => outcome,
                Err(err @ TransitionError::ConflictingTerminal { .. }) => {
                    warn!(%order_id, current = %current.status, requested = %to, "rejected terminal status change");
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };

            if let TransitionOutcome::Unchanged(_) = outcome {
                return Ok(StatusChange {
                    order: current,
                    outcome,
                });
            }

            match self
                .orders
                .compare_and_set_status(order_id, current.version, to, note.clone())
                .await?
            {
                CasOutcome::Applied(order) => {
                    info!(%order_id, from = %current.status, %to, "order status updated");
                    return Ok(StatusChange { order, outcome });
                }
                CasOutcome::Stale(latest) => {
                    warn!(%order_id, attempt, "order changed concurrently, re-evaluating");
                    current = latest;
                }
            }
        }

        Err(ServiceError::Conflict(format!(
            "Order {} changed concurrently",
            order_id
        )))
    }
}

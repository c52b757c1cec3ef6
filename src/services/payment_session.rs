use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};
use validator::{validate_email, Validate};

use crate::{
    errors::ServiceError,
    models::{
        BillingContact, CheckoutSession, NoticeLevel, Order, OrderId, OrderStatus,
        PAYER_ACTION_META_KEY,
    },
    processor::{
        purchase_unit_from_order, PaymentSource, PaymentSourceKind, ProcessorClient, ProcessorError,
        ProcessorOrder,
    },
    services::order_status::{OrderStatusService, TransitionError},
    store::OrderRepository,
};

/// How a confirmed payment session continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentSessionOutcome {
    /// The buyer has to complete the payment outside checkout (voucher).
    AwaitingPayerAction {
        href: String,
        processor_order_id: String,
    },
    /// The processor needs nothing more from the buyer.
    Completed { processor_order_id: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PaymentError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} is '{status}' and cannot start a payment")]
    InvalidOrderState {
        order_id: OrderId,
        status: OrderStatus,
    },
    #[error("Invalid billing contact: {0}")]
    InvalidContact(String),
    #[error("{diagnostic}")]
    Processor { diagnostic: String, retryable: bool },
    #[error("Store error: {0}")]
    Store(String),
}

impl From<PaymentError> for ServiceError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::OrderNotFound(id) => {
                ServiceError::NotFound(format!("Order {} not found", id))
            }
            PaymentError::InvalidOrderState { .. } => ServiceError::Conflict(err.to_string()),
            PaymentError::InvalidContact(msg) => ServiceError::ValidationError(msg),
            PaymentError::Processor { diagnostic, .. } => ServiceError::PaymentFailed(diagnostic),
            PaymentError::Store(msg) => ServiceError::InternalError(msg),
        }
    }
}

impl PaymentError {
    fn from_status_update(order_id: OrderId, err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => PaymentError::OrderNotFound(order_id),
            ServiceError::Transition(TransitionError::InvalidTransition { from, .. }) => {
                PaymentError::InvalidOrderState {
                    order_id,
                    status: from,
                }
            }
            ServiceError::Transition(TransitionError::ConflictingTerminal { current, .. }) => {
                PaymentError::InvalidOrderState {
                    order_id,
                    status: current,
                }
            }
            other => PaymentError::Store(other.to_string()),
        }
    }
}

/// Drives create -> confirm against the processor for a host order.
#[derive(Clone)]
pub struct PaymentSessionService {
    orders: Arc<dyn OrderRepository>,
    processor: Arc<dyn ProcessorClient>,
    status: OrderStatusService,
}

impl PaymentSessionService {
    pub fn new(orders: Arc<dyn OrderRepository>, processor: Arc<dyn ProcessorClient>) -> Self {
        let status = OrderStatusService::new(orders.clone());
        Self {
            orders,
            processor,
            status,
        }
    }

    /// Starts a payment for `order_id` with the given source kind.
    ///
    /// The order is put on hold before the processor is called. Processor
    /// failures fail the order, raise an error notice on `session` and come
    /// back as [`PaymentError::Processor`].
    #[instrument(skip(self, contact_override, session), fields(order_id = %order_id, source = %kind))]
    pub async fn begin_payment(
        &self,
        order_id: OrderId,
        kind: PaymentSourceKind,
        contact_override: Option<BillingContact>,
        session: &mut CheckoutSession,
    ) -> Result<PaymentSessionOutcome, PaymentError> {
        let order = self
            .orders
            .get(order_id)
            .await
            .map_err(|e| PaymentError::Store(e.to_string()))?
            .ok_or(PaymentError::OrderNotFound(order_id))?;

        if order.status != OrderStatus::PendingPayment {
            return Err(PaymentError::InvalidOrderState {
                order_id,
                status: order.status,
            });
        }

        let contact = contact_override.unwrap_or_else(|| order.billing.clone());
        validate_contact(kind, &contact)?;

        let held = self
            .status
            .update_status(
                order_id,
                OrderStatus::OnHold,
                Some(format!("Awaiting {} payment.", kind.label())),
            )
            .await
            .map_err(|e| PaymentError::from_status_update(order_id, e))?
            .order;

        let source = PaymentSource::for_checkout(kind, &contact);
        let confirmed = match self.create_and_confirm(&held, &source).await {
            Ok(confirmed) => confirmed,
            Err(err) => return Err(self.fail(order_id, err, session).await),
        };

        match confirmed.payer_action() {
            Some(link) => {
                self.orders
                    .set_meta(order_id, PAYER_ACTION_META_KEY, &link.href)
                    .await
                    .map_err(|e| PaymentError::Store(e.to_string()))?;
                counter!("payments.sessions.awaiting_payer_action", 1);
                info!(%order_id, processor_order_id = %confirmed.id, "awaiting payer action");
                Ok(PaymentSessionOutcome::AwaitingPayerAction {
                    href: link.href.clone(),
                    processor_order_id: confirmed.id.clone(),
                })
            }
            None => {
                session.clear_cart();
                counter!("payments.sessions.completed", 1);
                info!(%order_id, processor_order_id = %confirmed.id, "payment confirmed without payer action");
                Ok(PaymentSessionOutcome::Completed {
                    processor_order_id: confirmed.id.clone(),
                })
            }
        }
    }

    /// Payer-action URL stored for an order awaiting a voucher payment.
    pub async fn payer_action_url(&self, order_id: OrderId) -> Result<Option<String>, PaymentError> {
        let order = self
            .orders
            .get(order_id)
            .await
            .map_err(|e| PaymentError::Store(e.to_string()))?
            .ok_or(PaymentError::OrderNotFound(order_id))?;
        Ok(order.payer_action_url().map(str::to_string))
    }

    async fn create_and_confirm(
        &self,
        order: &Order,
        source: &PaymentSource,
    ) -> Result<ProcessorOrder, ProcessorError> {
        let unit = purchase_unit_from_order(order);
        let created = self.processor.create_order(std::slice::from_ref(&unit)).await?;
        self.processor.confirm_payment_source(&created.id, source).await
    }

    async fn fail(
        &self,
        order_id: OrderId,
        err: ProcessorError,
        session: &mut CheckoutSession,
    ) -> PaymentError {
        let diagnostic = err.diagnostic();
        let retryable = err.is_retryable();
        error!(%order_id, retryable, error = %diagnostic, "payment processor call failed");
        counter!("payments.sessions.failed", 1);

        session.add_notice(NoticeLevel::Error, diagnostic.clone());
        if let Err(update_err) = self
            .status
            .update_status(order_id, OrderStatus::Failed, Some(diagnostic.clone()))
            .await
        {
            error!(%order_id, error = %update_err, "could not mark order failed");
        }

        PaymentError::Processor {
            diagnostic,
            retryable,
        }
    }
}

/// Vouchers are issued in the buyer's name, so OXXO needs the whole contact.
/// Wallet payments only forward the email, and only when there is one.
fn validate_contact(kind: PaymentSourceKind, contact: &BillingContact) -> Result<(), PaymentError> {
    match kind {
        PaymentSourceKind::Oxxo => contact
            .validate()
            .map_err(|e| PaymentError::InvalidContact(e.to_string())),
        PaymentSourceKind::Paypal => {
            if contact.email.is_empty() || validate_email(contact.email.as_str()) {
                Ok(())
            } else {
                Err(PaymentError::InvalidContact(
                    "email: invalid email address".to_string(),
                ))
            }
        }
    }
}

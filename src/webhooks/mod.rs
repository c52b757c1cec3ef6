/*!
 * # Processor Webhooks
 *
 * Inbound notifications are routed to the first registered handler that is
 * responsible for the event type. Handlers report a [`ReconciliationResult`]
 * instead of failing; business failures are answered with `success: false`
 * so the processor does not redeliver them forever.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::models::{OrderId, SubscriptionId};

pub mod payment_sale_completed;
pub mod signature;

pub use payment_sale_completed::PaymentSaleCompletedHandler;

/// Notification envelope; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookNotification {
    #[serde(default)]
    pub id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub resource: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalFailure {
    pub subscription_id: SubscriptionId,
    pub reason: String,
}

/// Outcome of handling one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationResult {
    NotResponsible,
    MalformedPayload(String),
    MissingCorrelationKey,
    NoMatchingSubscription { billing_agreement_id: String },
    /// The correlation lookup itself failed.
    LookupFailed(String),
    Reconciled {
        renewals: Vec<OrderId>,
        duplicates: Vec<OrderId>,
        failures: Vec<RenewalFailure>,
    },
}

/// Body answered to the processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

impl ReconciliationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ReconciliationResult::Reconciled { .. })
    }

    pub fn into_response(self) -> WebhookResponse {
        match self {
            ReconciliationResult::NotResponsible => {
                WebhookResponse::failed("Event type is not handled.")
            }
            ReconciliationResult::MalformedPayload(reason) => WebhookResponse::failed(reason),
            ReconciliationResult::MissingCorrelationKey => WebhookResponse::failed(
                "Could not retrieve billing agreement id for subscription.",
            ),
            ReconciliationResult::NoMatchingSubscription {
                billing_agreement_id,
            } => WebhookResponse::failed(format!(
                "Could not retrieve subscriptions for billing agreement: {}",
                billing_agreement_id
            )),
            ReconciliationResult::LookupFailed(reason) => WebhookResponse::failed(reason),
            ReconciliationResult::Reconciled { failures, .. } => WebhookResponse {
                success: true,
                message: (!failures.is_empty()).then(|| {
                    failures
                        .iter()
                        .map(|f| format!("subscription {}: {}", f.subscription_id, f.reason))
                        .collect::<Vec<_>>()
                        .join("; ")
                }),
            },
        }
    }
}

#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// Event types this handler declares.
    fn event_types(&self) -> &'static [&'static str];

    fn responsible_for(&self, notification: &WebhookNotification) -> bool {
        self.event_types()
            .iter()
            .any(|event_type| *event_type == notification.event_type)
    }

    async fn handle(&self, notification: &WebhookNotification) -> ReconciliationResult;
}

/// Ordered handler list; the first responsible handler wins.
#[derive(Clone, Default)]
pub struct WebhookRegistry {
    handlers: Vec<Arc<dyn WebhookHandler>>,
}

impl WebhookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: Arc<dyn WebhookHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub async fn dispatch(&self, notification: &WebhookNotification) -> ReconciliationResult {
        match self
            .handlers
            .iter()
            .find(|handler| handler.responsible_for(notification))
        {
            Some(handler) => handler.handle(notification).await,
            None => {
                info!(event_type = %notification.event_type, "no handler for webhook event");
                ReconciliationResult::NotResponsible
            }
        }
    }
}

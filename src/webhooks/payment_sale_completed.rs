use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::{ReconciliationResult, RenewalFailure, WebhookHandler, WebhookNotification};
use crate::{
    services::order_status::OrderStatusService,
    store::{OrderRepository, RenewalInsert, SubscriptionRepository},
};

pub const PAYMENT_SALE_COMPLETED: &str = "PAYMENT.SALE.COMPLETED";

/// Mints a renewal order for every subscription billed under the completed
/// sale's billing agreement.
pub struct PaymentSaleCompletedHandler {
    orders: Arc<dyn OrderRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    status: OrderStatusService,
}

impl PaymentSaleCompletedHandler {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        let status = OrderStatusService::new(orders.clone());
        Self {
            orders,
            subscriptions,
            status,
        }
    }
}

fn non_empty_str<'a>(resource: &'a Value, key: &str) -> Option<&'a str> {
    resource
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl WebhookHandler for PaymentSaleCompletedHandler {
    fn event_types(&self) -> &'static [&'static str] {
        &[PAYMENT_SALE_COMPLETED]
    }

    #[instrument(skip(self, notification), fields(webhook_id = ?notification.id, event_type = %notification.event_type))]
    async fn handle(&self, notification: &WebhookNotification) -> ReconciliationResult {
        if !self.responsible_for(notification) {
            return ReconciliationResult::NotResponsible;
        }

        let Some(resource) = notification.resource.as_ref().filter(|r| r.is_object()) else {
            warn!("notification without resource");
            counter!("webhooks.payment_sale_completed.malformed", 1);
            return ReconciliationResult::MalformedPayload(
                "Notification resource is missing.".to_string(),
            );
        };

        let Some(billing_agreement_id) = non_empty_str(resource, "billing_agreement_id") else {
            warn!("Could not retrieve billing agreement id for subscription.");
            counter!("webhooks.payment_sale_completed.missing_key", 1);
            return ReconciliationResult::MissingCorrelationKey;
        };
        let transaction_id = non_empty_str(resource, "id");

        let subscriptions = match self
            .subscriptions
            .find_by_billing_agreement(billing_agreement_id)
            .await
        {
            Ok(found) => found,
            Err(err) => {
                error!(billing_agreement_id, error = %err, "subscription lookup failed");
                return ReconciliationResult::LookupFailed(format!(
                    "Could not look up subscriptions for billing agreement: {}",
                    billing_agreement_id
                ));
            }
        };

        if subscriptions.is_empty() {
            warn!(
                billing_agreement_id,
                "Could not retrieve subscriptions for billing agreement"
            );
            counter!("webhooks.payment_sale_completed.unmatched", 1);
            return ReconciliationResult::NoMatchingSubscription {
                billing_agreement_id: billing_agreement_id.to_string(),
            };
        }
        if subscriptions.len() > 1 {
            warn!(
                billing_agreement_id,
                matches = subscriptions.len(),
                "billing agreement matches several subscriptions, renewing each"
            );
        }

        let mut renewals = Vec::new();
        let mut duplicates = Vec::new();
        let mut failures = Vec::new();

        for subscription in subscriptions {
            let inserted = match self
                .orders
                .create_renewal(subscription.renewal_order(), subscription.id, transaction_id)
                .await
            {
                Ok(inserted) => inserted,
                Err(err) => {
                    error!(subscription_id = %subscription.id, error = %err, "could not create renewal order");
                    failures.push(RenewalFailure {
                        subscription_id: subscription.id,
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let order_id = inserted.order().id;
            // Completing an existing renewal again heals a partially applied delivery.
            if let Err(err) = self.status.payment_complete(order_id, transaction_id).await {
                error!(%order_id, subscription_id = %subscription.id, error = %err, "could not complete renewal payment");
                failures.push(RenewalFailure {
                    subscription_id: subscription.id,
                    reason: err.to_string(),
                });
                continue;
            }

            match inserted {
                RenewalInsert::Created(_) => {
                    info!(%order_id, subscription_id = %subscription.id, ?transaction_id, "renewal order created");
                    renewals.push(order_id);
                }
                RenewalInsert::Existing(_) => {
                    info!(%order_id, subscription_id = %subscription.id, ?transaction_id, "renewal already recorded for this sale");
                    duplicates.push(order_id);
                }
            }
        }

        counter!("webhooks.payment_sale_completed.renewals", renewals.len() as u64);
        counter!("webhooks.payment_sale_completed.duplicates", duplicates.len() as u64);

        ReconciliationResult::Reconciled {
            renewals,
            duplicates,
            failures,
        }
    }
}

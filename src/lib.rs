//! Gateway Bridge Library
//!
//! Connects a payment processor's checkout, vault and webhook APIs to a
//! store's order lifecycle: voucher payment sessions, webhook-driven
//! subscription renewals and checkout eligibility checks.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod services;
pub mod store;
pub mod webhooks;

use axum::response::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::processor::ProcessorClient;
use crate::services::{
    CheckoutEligibility, OrderStatusService, PaymentSessionService, SetupTokenService,
};
use crate::store::{InMemoryStore, OrderRepository, ProductCatalog, SubscriptionRepository};
use crate::webhooks::{PaymentSaleCompletedHandler, WebhookRegistry};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub orders: Arc<dyn OrderRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub processor: Arc<dyn ProcessorClient>,
    pub webhooks: WebhookRegistry,
}

impl AppState {
    /// Wires every repository to `store` and registers the webhook handlers.
    pub fn new(
        config: config::AppConfig,
        store: Arc<InMemoryStore>,
        processor: Arc<dyn ProcessorClient>,
    ) -> Self {
        let orders: Arc<dyn OrderRepository> = store.clone();
        let subscriptions: Arc<dyn SubscriptionRepository> = store.clone();
        let catalog: Arc<dyn ProductCatalog> = store;

        let webhooks = WebhookRegistry::new().register(Arc::new(
            PaymentSaleCompletedHandler::new(orders.clone(), subscriptions.clone()),
        ));

        Self {
            config,
            orders,
            subscriptions,
            catalog,
            processor,
            webhooks,
        }
    }

    pub fn order_status_service(&self) -> OrderStatusService {
        OrderStatusService::new(self.orders.clone())
    }

    pub fn payment_session_service(&self) -> PaymentSessionService {
        PaymentSessionService::new(self.orders.clone(), self.processor.clone())
    }

    pub fn eligibility_service(&self) -> CheckoutEligibility {
        CheckoutEligibility::new(self.catalog.clone(), self.orders.clone())
    }

    pub fn setup_token_service(&self) -> SetupTokenService {
        SetupTokenService::new(
            self.processor.clone(),
            self.config.vault_return_url.clone(),
            self.config.vault_cancel_url.clone(),
        )
    }
}

// Common response wrappers
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

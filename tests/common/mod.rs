#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use gateway_bridge::{
    config::AppConfig,
    handlers::app_router,
    models::{BillingContact, LineItem, NewOrder, NewSubscription, Order, ProductId},
    processor::{
        Link, PaymentSource, ProcessorClient, ProcessorError, ProcessorOrder, PurchaseUnit,
        SetupToken,
    },
    store::{InMemoryStore, OrderRepository},
    AppState,
};
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const VOUCHER_URL: &str = "https://www.sandbox.paypal.com/payment/oxxo?token=VOUCHER-1";

/// What the fake processor answers to `confirm_payment_source`.
#[derive(Debug, Clone)]
pub enum ConfirmScript {
    PayerAction(String),
    Completed,
    Fail(ProcessorError),
}

/// Scripted stand-in for the processor's REST API.
pub struct FakeProcessor {
    confirm: Mutex<ConfirmScript>,
    create_failure: Mutex<Option<ProcessorError>>,
    pub create_calls: AtomicUsize,
    pub confirm_calls: AtomicUsize,
    pub setup_token_calls: AtomicUsize,
    pub last_units: Mutex<Vec<PurchaseUnit>>,
    pub last_source: Mutex<Option<PaymentSource>>,
}

impl FakeProcessor {
    pub fn new(confirm: ConfirmScript) -> Self {
        Self {
            confirm: Mutex::new(confirm),
            create_failure: Mutex::new(None),
            create_calls: AtomicUsize::new(0),
            confirm_calls: AtomicUsize::new(0),
            setup_token_calls: AtomicUsize::new(0),
            last_units: Mutex::new(Vec::new()),
            last_source: Mutex::new(None),
        }
    }

    pub fn voucher() -> Self {
        Self::new(ConfirmScript::PayerAction(VOUCHER_URL.to_string()))
    }

    pub fn set_confirm(&self, script: ConfirmScript) {
        *self.confirm.lock().unwrap() = script;
    }

    pub fn fail_create(&self, error: ProcessorError) {
        *self.create_failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl ProcessorClient for FakeProcessor {
    async fn create_order(&self, units: &[PurchaseUnit]) -> Result<ProcessorOrder, ProcessorError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_units.lock().unwrap() = units.to_vec();
        if let Some(error) = self.create_failure.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(ProcessorOrder {
            id: format!("PROC-{n}"),
            status: Some("CREATED".to_string()),
            links: Vec::new(),
        })
    }

    async fn confirm_payment_source(
        &self,
        order_id: &str,
        source: &PaymentSource,
    ) -> Result<ProcessorOrder, ProcessorError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_source.lock().unwrap() = Some(source.clone());
        match self.confirm.lock().unwrap().clone() {
            ConfirmScript::PayerAction(href) => Ok(ProcessorOrder {
                id: order_id.to_string(),
                status: Some("PAYER_ACTION_REQUIRED".to_string()),
                links: vec![Link {
                    href,
                    rel: "payer-action".to_string(),
                    method: Some("GET".to_string()),
                }],
            }),
            ConfirmScript::Completed => Ok(ProcessorOrder {
                id: order_id.to_string(),
                status: Some("COMPLETED".to_string()),
                links: Vec::new(),
            }),
            ConfirmScript::Fail(error) => Err(error),
        }
    }

    async fn create_setup_token(&self, source: &PaymentSource) -> Result<SetupToken, ProcessorError> {
        self.setup_token_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_source.lock().unwrap() = Some(source.clone());
        Ok(SetupToken {
            id: "5C991763VB2781612".to_string(),
            status: Some("PAYER_ACTION_REQUIRED".to_string()),
            links: Vec::new(),
        })
    }
}

pub fn buyer() -> BillingContact {
    BillingContact {
        first_name: "María".to_string(),
        last_name: "López".to_string(),
        email: "maria@example.mx".to_string(),
        country_code: "MX".to_string(),
    }
}

pub fn mug_order() -> NewOrder {
    NewOrder::new(
        "MXN",
        vec![
            LineItem::new(ProductId(10), "Talavera mug", 2, dec!(150.00)),
            LineItem::new(ProductId(11), "Recipe e-book", 1, dec!(99.00)).digital(),
        ],
        buyer(),
    )
}

pub fn coffee_subscription(billing_agreement_id: &str) -> NewSubscription {
    NewSubscription {
        billing_agreement_id: Some(billing_agreement_id.to_string()),
        parent_order_id: None,
        currency: "MXN".to_string(),
        items: vec![LineItem::new(ProductId(20), "Coffee beans 1kg", 1, dec!(320.00))],
        billing: buyer(),
    }
}

/// Application wired to an in-memory store and a scripted processor.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub processor: Arc<FakeProcessor>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(FakeProcessor::voucher(), None)
    }

    pub fn with_processor(processor: FakeProcessor) -> Self {
        Self::build(processor, None)
    }

    pub fn with_webhook_secret() -> Self {
        Self::build(FakeProcessor::voucher(), Some(WEBHOOK_SECRET))
    }

    fn build(processor: FakeProcessor, webhook_secret: Option<&str>) -> Self {
        let mut cfg = AppConfig::new(
            "http://processor.invalid".to_string(),
            "test-access-token".to_string(),
            "test".to_string(),
        );
        cfg.webhook_secret = webhook_secret.map(str::to_string);

        let store = Arc::new(InMemoryStore::new());
        let processor = Arc::new(processor);
        let state = AppState::new(cfg, store.clone(), processor.clone());
        let router = app_router(state.clone());

        Self {
            router,
            state,
            store,
            processor,
        }
    }

    pub async fn seed_order(&self, draft: NewOrder) -> Order {
        OrderRepository::create(self.store.as_ref(), draft)
            .await
            .expect("seed order")
    }

    pub async fn order(&self, order: &Order) -> Order {
        OrderRepository::get(self.store.as_ref(), order.id)
            .await
            .expect("store read")
            .expect("order exists")
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn request_raw(&self, uri: &str, headers: &[(&str, &str)], body: Vec<u8>) -> Response {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body)).expect("request")).await
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

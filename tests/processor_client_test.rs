//! Wire-level tests for the reqwest processor client against a mock server.

use std::time::Duration;

use assert_matches::assert_matches;
use gateway_bridge::{
    models::{BillingContact, LineItem, NewOrder, OrderId, ProductId},
    processor::{
        purchase_unit_from_order, HttpProcessorClient, PaymentSource, PaymentSourceKind,
        ProcessorClient, ProcessorError,
    },
};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn client(server: &MockServer) -> HttpProcessorClient {
    HttpProcessorClient::new(server.uri(), "A21AAF-test-token", Duration::from_millis(500))
        .expect("client builds")
}

fn contact() -> BillingContact {
    BillingContact {
        first_name: "Juan".to_string(),
        last_name: "Pérez".to_string(),
        email: "juan@example.mx".to_string(),
        country_code: "MX".to_string(),
    }
}

fn oxxo_source() -> PaymentSource {
    PaymentSource::for_checkout(PaymentSourceKind::Oxxo, &contact())
}

#[tokio::test]
async fn test_create_order_posts_capture_intent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders"))
        .and(header("authorization", "Bearer A21AAF-test-token"))
        .and(body_partial_json(json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": "42",
                "amount": { "currency_code": "MXN", "value": "240.00" }
            }]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "5O190127TN364715T",
            "status": "CREATED",
            "links": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = NewOrder::new(
        "MXN",
        vec![LineItem::new(ProductId(3), "Tote bag", 2, dec!(120))],
        contact(),
    )
    .into_order(OrderId(42));

    let created = client(&server)
        .create_order(&[purchase_unit_from_order(&order)])
        .await
        .unwrap();

    assert_eq!(created.id, "5O190127TN364715T");
    assert_eq!(created.status.as_deref(), Some("CREATED"));
}

#[tokio::test]
async fn test_confirm_returns_payer_action_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders/5O190127TN364715T/confirm-payment-source"))
        .and(body_partial_json(json!({
            "payment_source": {
                "oxxo": {
                    "name": "Juan Pérez",
                    "email": "juan@example.mx",
                    "country_code": "MX"
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "5O190127TN364715T",
            "status": "PAYER_ACTION_REQUIRED",
            "links": [
                { "href": "https://api.example.test/v2/checkout/orders/5O190127TN364715T", "rel": "self", "method": "GET" },
                { "href": "https://www.example.test/payment/oxxo?token=5O190127TN364715T", "rel": "payer-action", "method": "GET" }
            ]
        })))
        .mount(&server)
        .await;

    let confirmed = client(&server)
        .confirm_payment_source("5O190127TN364715T", &oxxo_source())
        .await
        .unwrap();

    let link = confirmed.payer_action().expect("payer action link");
    assert_eq!(
        link.href,
        "https://www.example.test/payment/oxxo?token=5O190127TN364715T"
    );
}

#[tokio::test]
async fn test_structured_error_keeps_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders/BAD/confirm-payment-source"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "name": "UNPROCESSABLE_ENTITY",
            "message": "The requested action could not be performed, semantically incorrect, or failed business validation.",
            "details": [{
                "issue": "PAYEE_NOT_ENABLED_FOR_OXXO",
                "description": "Payee is not enabled for OXXO."
            }]
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .confirm_payment_source("BAD", &oxxo_source())
        .await
        .unwrap_err();

    assert_matches!(&err, ProcessorError::Api { status: 422, details, .. } if details.len() == 1);
    assert_eq!(
        err.diagnostic(),
        "PAYEE_NOT_ENABLED_FOR_OXXO Payee is not enabled for OXXO."
    );
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unstructured_error_uses_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).create_order(&[]).await.unwrap_err();

    assert_matches!(&err, ProcessorError::Api { status: 503, message, .. } if message == "upstream unavailable");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_empty_error_body_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/vault/setup-tokens"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server)
        .create_setup_token(&oxxo_source())
        .await
        .unwrap_err();

    assert_eq!(err.diagnostic(), "HTTP 401");
}

#[tokio::test]
async fn test_slow_processor_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "LATE", "status": "CREATED" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client(&server).create_order(&[]).await.unwrap_err();

    assert_eq!(err, ProcessorError::Timeout(Duration::from_millis(500)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_undecodable_success_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/checkout/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .mount(&server)
        .await;

    let err = client(&server).create_order(&[]).await.unwrap_err();

    assert_matches!(err, ProcessorError::Decode(_));
}

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::entities::{
    ApiErrorBody, ConfirmPaymentSourceRequest, CreateOrderRequest, PaymentSource, ProcessorOrder,
    PurchaseUnit, SetupToken,
};
use super::{ProcessorClient, ProcessorError};
use crate::config::AppConfig;

const CHECKOUT_INTENT: &str = "CAPTURE";
const RAW_ERROR_LIMIT: usize = 200;

/// reqwest-backed processor client authenticating with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpProcessorClient {
    base_url: String,
    access_token: String,
    timeout: Duration,
    client: Client,
}

impl HttpProcessorClient {
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProcessorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProcessorError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ProcessorError> {
        Self::new(
            config.processor_base_url.clone(),
            config.processor_access_token.clone(),
            config.processor_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProcessorError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "calling payment processor");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Prefer", "return=representation")
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ProcessorError::Decode(e.to_string()))
        } else {
            Err(Self::api_error(response).await)
        }
    }

    fn classify(&self, err: reqwest::Error) -> ProcessorError {
        if err.is_timeout() {
            warn!(timeout = ?self.timeout, "payment processor timed out");
            ProcessorError::Timeout(self.timeout)
        } else {
            ProcessorError::Transport(err.to_string())
        }
    }

    async fn api_error(response: Response) -> ProcessorError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) if body.message.is_some() || !body.details.is_empty() => {
                ProcessorError::Api {
                    status,
                    message: body
                        .message
                        .unwrap_or_else(|| format!("HTTP {}", status)),
                    name: body.name,
                    details: body.details,
                }
            }
            _ => ProcessorError::Api {
                status,
                name: None,
                message: if text.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    text.chars().take(RAW_ERROR_LIMIT).collect()
                },
                details: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    #[instrument(skip(self, units), fields(units = units.len()))]
    async fn create_order(&self, units: &[PurchaseUnit]) -> Result<ProcessorOrder, ProcessorError> {
        let request = CreateOrderRequest {
            intent: CHECKOUT_INTENT,
            purchase_units: units,
        };
        self.post("/v2/checkout/orders", &request).await
    }

    #[instrument(skip(self, source), fields(source = %source.kind()))]
    async fn confirm_payment_source(
        &self,
        order_id: &str,
        source: &PaymentSource,
    ) -> Result<ProcessorOrder, ProcessorError> {
        let request = ConfirmPaymentSourceRequest {
            payment_source: source,
        };
        self.post(
            &format!("/v2/checkout/orders/{}/confirm-payment-source", order_id),
            &request,
        )
        .await
    }

    #[instrument(skip(self, source), fields(source = %source.kind()))]
    async fn create_setup_token(&self, source: &PaymentSource) -> Result<SetupToken, ProcessorError> {
        let request = ConfirmPaymentSourceRequest {
            payment_source: source,
        };
        self.post("/v3/vault/setup-tokens", &request).await
    }
}

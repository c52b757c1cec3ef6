/*!
 * # Payment Processor Client
 *
 * Typed access to the processor's order, payment-source confirmation and
 * vault endpoints. `ProcessorClient` is the seam the services depend on;
 * `HttpProcessorClient` is the production implementation.
 */

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod entities;
pub mod http_client;
pub mod purchase_unit;

pub use entities::{
    ErrorDetail, Link, PaymentSource, PaymentSourceKind, ProcessorOrder, PurchaseUnit, SetupToken,
};
pub use http_client::HttpProcessorClient;
pub use purchase_unit::purchase_unit_from_order;

/// Processor call failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("processor rejected the request ({status}): {message}")]
    Api {
        status: u16,
        name: Option<String>,
        message: String,
        details: Vec<ErrorDetail>,
    },
    #[error("processor request timed out after {0:?}")]
    Timeout(Duration),
    #[error("processor transport error: {0}")]
    Transport(String),
    #[error("unexpected processor response: {0}")]
    Decode(String),
}

impl ProcessorError {
    /// Timeouts, transport failures, throttling and 5xx answers may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProcessorError::Timeout(_) | ProcessorError::Transport(_) => true,
            ProcessorError::Api { status, .. } => *status == 429 || *status >= 500,
            ProcessorError::Decode(_) => false,
        }
    }

    /// Single-line diagnostic: structured details joined by `"; "`, or the
    /// raw message for unstructured failures.
    pub fn diagnostic(&self) -> String {
        match self {
            ProcessorError::Api {
                details, message, ..
            } => {
                let rendered: Vec<String> = details
                    .iter()
                    .map(ErrorDetail::render)
                    .filter(|line| !line.is_empty())
                    .collect();
                if rendered.is_empty() {
                    message.clone()
                } else {
                    rendered.join("; ")
                }
            }
            other => other.to_string(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    async fn create_order(&self, units: &[PurchaseUnit]) -> Result<ProcessorOrder, ProcessorError>;

    async fn confirm_payment_source(
        &self,
        order_id: &str,
        source: &PaymentSource,
    ) -> Result<ProcessorOrder, ProcessorError>;

    async fn create_setup_token(&self, source: &PaymentSource)
        -> Result<SetupToken, ProcessorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(issue: &str, field: &str, description: &str) -> ErrorDetail {
        ErrorDetail {
            issue: Some(issue.into()),
            field: Some(field.into()),
            description: Some(description.into()),
        }
    }

    #[test]
    fn structured_details_become_one_diagnostic() {
        let err = ProcessorError::Api {
            status: 422,
            name: Some("UNPROCESSABLE_ENTITY".into()),
            message: "The requested action could not be performed".into(),
            details: vec![
                detail("MISSING_REQUIRED_PARAMETER", "/payment_source/oxxo/email", "A required field is missing."),
                detail("INVALID_COUNTRY_CODE", "/payment_source/oxxo/country_code", "Country code is invalid."),
            ],
        };

        assert_eq!(
            err.diagnostic(),
            "MISSING_REQUIRED_PARAMETER /payment_source/oxxo/email A required field is missing.; \
             INVALID_COUNTRY_CODE /payment_source/oxxo/country_code Country code is invalid."
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn unstructured_failures_use_raw_message() {
        let err = ProcessorError::Api {
            status: 500,
            name: None,
            message: "upstream exploded".into(),
            details: vec![],
        };
        assert_eq!(err.diagnostic(), "upstream exploded");
        assert!(err.is_retryable());

        let timeout = ProcessorError::Timeout(Duration::from_secs(10));
        assert!(timeout.is_retryable());
        assert_eq!(timeout.diagnostic(), "processor request timed out after 10s");
    }
}

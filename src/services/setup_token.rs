use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::processor::{
    entities::{ExperienceContext, PaypalWalletSource, UsageType},
    PaymentSource, ProcessorClient, ProcessorError, SetupToken,
};

/// Vaults a wallet for later merchant-initiated charges.
#[derive(Clone)]
pub struct SetupTokenService {
    processor: Arc<dyn ProcessorClient>,
    return_url: String,
    cancel_url: String,
}

impl SetupTokenService {
    pub fn new(
        processor: Arc<dyn ProcessorClient>,
        return_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            return_url: return_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    pub fn payment_source(&self) -> PaymentSource {
        PaymentSource::Paypal(PaypalWalletSource {
            usage_type: Some(UsageType::Merchant),
            email_address: None,
            experience_context: Some(ExperienceContext {
                return_url: self.return_url.clone(),
                cancel_url: self.cancel_url.clone(),
            }),
        })
    }

    #[instrument(skip(self))]
    pub async fn create_setup_token(&self) -> Result<SetupToken, ProcessorError> {
        match self.processor.create_setup_token(&self.payment_source()).await {
            Ok(token) => {
                info!(token_id = %token.id, "setup token created");
                Ok(token)
            }
            Err(err) => {
                error!(error = %err, "could not create setup token");
                Err(err)
            }
        }
    }
}

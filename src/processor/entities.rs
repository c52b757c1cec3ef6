//! Request and response documents exchanged with the payment processor.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BillingContact;

/// Monetary amount in the processor's wire format (`"10.00"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub currency_code: String,
    pub value: String,
}

impl Money {
    pub fn new(currency_code: &str, amount: Decimal) -> Self {
        Self {
            currency_code: currency_code.to_ascii_uppercase(),
            value: format!("{:.2}", amount.round_dp(2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AmountBreakdown {
    pub item_total: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub currency_code: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<AmountBreakdown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemCategory {
    PhysicalGoods,
    DigitalGoods,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub unit_amount: Money,
    pub quantity: String,
    pub category: ItemCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseUnit {
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UsageType {
    Merchant,
    Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceContext {
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaypalWalletSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_type: Option<UsageType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_context: Option<ExperienceContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxxoSource {
    pub name: String,
    pub email: String,
    pub country_code: String,
}

/// Payment source descriptor, serialized as `{"<kind>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSource {
    Paypal(PaypalWalletSource),
    Oxxo(OxxoSource),
}

/// Payment source kinds a buyer can pick at checkout.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentSourceKind {
    Paypal,
    Oxxo,
}

impl PaymentSourceKind {
    pub fn label(self) -> &'static str {
        match self {
            PaymentSourceKind::Paypal => "PayPal",
            PaymentSourceKind::Oxxo => "OXXO",
        }
    }
}

impl PaymentSource {
    /// Source descriptor for a checkout confirmation paid by `contact`.
    pub fn for_checkout(kind: PaymentSourceKind, contact: &BillingContact) -> Self {
        match kind {
            PaymentSourceKind::Paypal => PaymentSource::Paypal(PaypalWalletSource {
                email_address: Some(contact.email.clone()).filter(|email| !email.is_empty()),
                ..PaypalWalletSource::default()
            }),
            PaymentSourceKind::Oxxo => PaymentSource::Oxxo(OxxoSource {
                name: contact.full_name(),
                email: contact.email.clone(),
                country_code: contact.country_code.to_ascii_uppercase(),
            }),
        }
    }

    pub fn kind(&self) -> PaymentSourceKind {
        match self {
            PaymentSource::Paypal(_) => PaymentSourceKind::Paypal,
            PaymentSource::Oxxo(_) => PaymentSourceKind::Oxxo,
        }
    }
}

/// Hypermedia link attached to processor resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

pub const PAYER_ACTION_REL: &str = "payer-action";

/// Order resource as returned by create and confirm calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorOrder {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl ProcessorOrder {
    /// First link the buyer must follow outside the checkout session.
    pub fn payer_action(&self) -> Option<&Link> {
        self.links.iter().find(|link| link.rel == PAYER_ACTION_REL)
    }
}

/// Vault setup token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupToken {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateOrderRequest<'a> {
    pub intent: &'static str,
    pub purchase_units: &'a [PurchaseUnit],
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfirmPaymentSourceRequest<'a> {
    pub payment_source: &'a PaymentSource,
}

/// One entry of a structured processor error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub issue: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorDetail {
    /// `"<issue> <field> <description>"` with empty parts left out.
    pub fn render(&self) -> String {
        [&self.issue, &self.field, &self.description]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<ErrorDetail>,
}

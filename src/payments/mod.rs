//! Hosted-checkout payment provider boundary.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod events;
pub mod signature;
pub mod stripe;

pub use events::{PaymentEvent, WebhookEvent, parse_event};
pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("payment provider response is missing {0}")]
    MissingField(&'static str),
}

/// One purchasable line as shown on the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub name: String,
    pub description: Option<String>,
    pub unit_amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    /// Reconciliation key echoed back as `client_reference_id`.
    pub order_id: String,
    pub currency: String,
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub locale: String,
    pub shipping_countries: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingDetails {
    pub name: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectedInformation {
    pub shipping_details: Option<ShippingDetails>,
}

/// The provider's view of a checkout session, as delivered in webhooks or
/// fetched on demand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub client_reference_id: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub shipping_details: Option<ShippingDetails>,
    pub collected_information: Option<CollectedInformation>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// Shipping details moved under `collected_information` in newer API
    /// versions; accept either.
    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.collected_information
            .as_ref()
            .and_then(|info| info.shipping_details.as_ref())
            .or(self.shipping_details.as_ref())
    }

    /// Funds are captured; `unpaid` means a delayed payment method is still settling.
    pub fn is_paid(&self) -> bool {
        matches!(
            self.payment_status.as_deref(),
            Some("paid") | Some("no_payment_required")
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionLineItem {
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub amount_total: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: Option<i64>,
    pub last_payment_error: Option<PaymentErrorDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<HostedSession, PaymentError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;

    async fn list_line_items(&self, session_id: &str)
    -> Result<Vec<SessionLineItem>, PaymentError>;
}

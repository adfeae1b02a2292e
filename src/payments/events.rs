//! Webhook payloads parsed into one variant per event kind this service acts on.

use serde::Deserialize;
use serde_json::Value;

use super::{CheckoutSession, PaymentIntent};

#[derive(Debug, Clone)]
pub enum PaymentEvent {
    SessionCompleted(CheckoutSession),
    AsyncPaymentSucceeded(CheckoutSession),
    AsyncPaymentFailed(CheckoutSession),
    SessionExpired(CheckoutSession),
    PaymentIntentFailed(PaymentIntent),
    Unhandled,
}

#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: String,
    pub event: PaymentEvent,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: Value,
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, serde_json::Error> {
    let Envelope { id, kind, data } = serde_json::from_slice(payload)?;
    let object = data.object;

    let event = match kind.as_str() {
        "checkout.session.completed" => {
            PaymentEvent::SessionCompleted(serde_json::from_value(object)?)
        }
        "checkout.session.async_payment_succeeded" => {
            PaymentEvent::AsyncPaymentSucceeded(serde_json::from_value(object)?)
        }
        "checkout.session.async_payment_failed" => {
            PaymentEvent::AsyncPaymentFailed(serde_json::from_value(object)?)
        }
        "checkout.session.expired" => PaymentEvent::SessionExpired(serde_json::from_value(object)?),
        "payment_intent.payment_failed" => {
            PaymentEvent::PaymentIntentFailed(serde_json::from_value(object)?)
        }
        _ => PaymentEvent::Unhandled,
    };

    Ok(WebhookEvent { id, kind, event })
}

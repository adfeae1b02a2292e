use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{events::ActiveModel as EventActive, sea_orm_active_enums::EventKind},
    error::AppResult,
};

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::AddToCart => "add_to_cart",
            EventKind::CheckoutStarted => "checkout_started",
            EventKind::CheckoutCompleted => "checkout_completed",
            EventKind::CheckoutCancelled => "checkout_cancelled",
            EventKind::PaymentFailed => "payment_failed",
            EventKind::ChatbotUsed => "chatbot_used",
        }
    }

    /// Kinds the storefront may report through `POST /api/events`. Completion
    /// and payment failures are only ever written by the webhook.
    pub fn client_reportable(self) -> bool {
        matches!(
            self,
            EventKind::AddToCart
                | EventKind::CheckoutStarted
                | EventKind::CheckoutCancelled
                | EventKind::ChatbotUsed
        )
    }
}

pub async fn log_event<C: ConnectionTrait>(
    db: &C,
    name: EventKind,
    metadata: Option<Value>,
) -> AppResult<()> {
    EventActive {
        id: Set(Uuid::now_v7()),
        name: Set(name),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;

    Ok(())
}

/// Best-effort variant: a failed telemetry write never fails the caller.
pub async fn record<C: ConnectionTrait>(db: &C, name: EventKind, metadata: Value) {
    if let Err(err) = log_event(db, name, Some(metadata)).await {
        tracing::warn!(error = %err, event = ?name, "event log failed");
    }
}

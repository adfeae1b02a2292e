use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Authoritative lifecycle state of an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "payment_received")]
    PaymentReceived,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

/// Audit vocabulary for the status timeline. Wider than [`OrderStatus`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum StatusLogKind {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "payment_confirmed")]
    PaymentConfirmed,
    #[sea_orm(string_value = "shipped")]
    Shipped,
    #[sea_orm(string_value = "customer_contacted")]
    CustomerContacted,
    #[sea_orm(string_value = "reshipped")]
    Reshipped,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    #[sea_orm(string_value = "add_to_cart")]
    AddToCart,
    #[sea_orm(string_value = "checkout_started")]
    CheckoutStarted,
    #[sea_orm(string_value = "checkout_completed")]
    CheckoutCompleted,
    #[sea_orm(string_value = "checkout_cancelled")]
    CheckoutCancelled,
    #[sea_orm(string_value = "payment_failed")]
    PaymentFailed,
    #[sea_orm(string_value = "chatbot_used")]
    ChatbotUsed,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::OrderStatus,
    models::{Order, OrderItem, OrderMessage, Shipment, StatusLog},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    #[serde(alias = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub order_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    /// Payment not yet confirmed by the provider; poll again later.
    pub waiting_for_webhook: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackingQuery {
    #[serde(alias = "orderNumber")]
    pub order_number: String,
}

/// Public projection of an order. Carries no customer contact or address data.
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingView {
    pub order_number: String,
    pub status: OrderStatus,
    pub total: i64,
    pub shipping_cost: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<TrackedItem>,
    pub shipments: Vec<TrackedShipment>,
    pub messages: Vec<OrderMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackedItem {
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub variety: Option<String>,
    pub preorder: bool,
    pub shipped: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackedShipment {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub item_count: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CustomerMessageRequest {
    pub message: String,
    #[serde(default, alias = "isIncident")]
    pub is_incident: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OperatorMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipments: Vec<Shipment>,
    pub status_logs: Vec<StatusLog>,
    pub messages: Vec<OrderMessage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

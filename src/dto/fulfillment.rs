use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::sea_orm_active_enums::StatusLogKind,
    lifecycle::OrderAction,
    models::{Order, Shipment, StatusLog},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    #[serde(default)]
    pub item_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendStatusLogRequest {
    pub status: StatusLogKind,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderActionRequest {
    pub action: OrderAction,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderActionResponse {
    pub order: Order,
    pub log: StatusLog,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentList {
    pub items: Vec<Shipment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusLogList {
    pub items: Vec<StatusLog>,
}

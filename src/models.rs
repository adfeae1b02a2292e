use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    order_items, order_messages, order_status_logs, orders, products,
    sea_orm_active_enums::{OrderStatus, StatusLogKind},
    shipments,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub weight_grams: i32,
    pub variety: Option<String>,
    pub season_start_month: Option<i32>,
    pub season_end_month: Option<i32>,
    pub in_season: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShippingAddress {
    pub name: Option<String>,
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Full order record, including customer data. Operator-facing only.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub stripe_session_id: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub destination_country: String,
    pub locale: String,
    pub shipping_cost: i64,
    pub total: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub product_name: String,
    pub variety: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub preorder: bool,
    pub shipped: bool,
    pub shipped_at: Option<DateTime<Utc>>,
    pub shipment_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub item_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderMessage {
    pub id: Uuid,
    pub message: String,
    pub is_incident: bool,
    pub from_customer: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusLog {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: StatusLogKind,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(model: products::Model, month: u32) -> Self {
        let in_season = crate::services::product_service::in_season(&model, month);
        Product {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            weight_grams: model.weight_grams,
            variety: model.variety,
            season_start_month: model.season_start_month,
            season_end_month: model.season_end_month,
            in_season,
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        let has_address = model.shipping_line1.is_some() || model.shipping_name.is_some();
        let shipping_address = has_address.then(|| ShippingAddress {
            name: model.shipping_name,
            line1: model.shipping_line1,
            line2: model.shipping_line2,
            city: model.shipping_city,
            state: model.shipping_state,
            postal_code: model.shipping_postal_code,
            country: model.shipping_country,
        });
        Order {
            id: model.id,
            order_number: model.order_number,
            stripe_session_id: model.stripe_session_id,
            customer_email: model.customer_email,
            customer_phone: model.customer_phone,
            shipping_address,
            destination_country: model.destination_country,
            locale: model.locale,
            shipping_cost: model.shipping_cost,
            total: model.total,
            currency: model.currency,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
            completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            product_name: model.product_name,
            variety: model.variety,
            quantity: model.quantity,
            unit_price: model.unit_price,
            preorder: model.preorder,
            shipped: model.shipped,
            shipped_at: model.shipped_at.map(|dt| dt.with_timezone(&Utc)),
            shipment_id: model.shipment_id,
        }
    }
}

impl Shipment {
    pub fn from_entity(model: shipments::Model, item_ids: Vec<Uuid>) -> Self {
        Shipment {
            id: model.id,
            order_id: model.order_id,
            tracking_number: model.tracking_number,
            carrier: model.carrier,
            shipped_at: model.shipped_at.map(|dt| dt.with_timezone(&Utc)),
            item_ids,
        }
    }
}

impl From<order_messages::Model> for OrderMessage {
    fn from(model: order_messages::Model) -> Self {
        OrderMessage {
            id: model.id,
            message: model.message,
            is_incident: model.is_incident,
            from_customer: model.from_customer,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<order_status_logs::Model> for StatusLog {
    fn from(model: order_status_logs::Model) -> Self {
        StatusLog {
            id: model.id,
            order_id: model.order_id,
            status: model.status,
            description: model.description,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

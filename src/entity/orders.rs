use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::OrderStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    #[sea_orm(unique)]
    pub stripe_session_id: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_name: Option<String>,
    pub shipping_line1: Option<String>,
    pub shipping_line2: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_state: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,
    pub destination_country: String,
    pub locale: String,
    pub shipping_cost: i64,
    pub total: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::shipments::Entity")]
    Shipments,
    #[sea_orm(has_many = "super::order_messages::Entity")]
    OrderMessages,
    #[sea_orm(has_many = "super::order_status_logs::Entity")]
    OrderStatusLogs,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::shipments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

impl Related<super::order_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderMessages.def()
    }
}

impl Related<super::order_status_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderStatusLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Query and write primitives shared by every order workflow.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    entity::{
        OrderItems, OrderMessages, OrderStatusLogs, Orders, Shipments,
        order_items::{Column as OrderItemCol, Model as OrderItemModel},
        order_messages::{
            ActiveModel as MessageActive, Column as MessageCol, Model as MessageModel,
        },
        order_status_logs::{
            ActiveModel as StatusLogActive, Column as StatusLogCol, Model as StatusLogModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        sea_orm_active_enums::{OrderStatus, StatusLogKind},
        shipments::{Column as ShipmentCol, Model as ShipmentModel},
    },
    error::{AppError, AppResult},
};

const PLACEHOLDER_PREFIX: &str = "pending_";

/// Session id stored on an order until the provider issues the real one.
pub fn placeholder_session_id(order_id: Uuid) -> String {
    format!("{PLACEHOLDER_PREFIX}{order_id}")
}

pub fn is_placeholder_session(session_id: &str) -> bool {
    session_id.starts_with(PLACEHOLDER_PREFIX)
}

pub async fn get_order<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn find_by_number<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
) -> AppResult<Option<OrderModel>> {
    Ok(Orders::find()
        .filter(OrderCol::OrderNumber.eq(order_number))
        .one(db)
        .await?)
}

pub async fn find_by_session<C: ConnectionTrait>(
    db: &C,
    session_id: &str,
) -> AppResult<Option<OrderModel>> {
    Ok(Orders::find()
        .filter(OrderCol::StripeSessionId.eq(session_id))
        .one(db)
        .await?)
}

pub async fn items_for<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::Position)
        .all(db)
        .await?)
}

pub async fn shipments_for<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
) -> AppResult<Vec<ShipmentModel>> {
    Ok(Shipments::find()
        .filter(ShipmentCol::OrderId.eq(order_id))
        .order_by_asc(ShipmentCol::CreatedAt)
        .order_by_asc(ShipmentCol::Id)
        .all(db)
        .await?)
}

pub async fn messages_for<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<Vec<MessageModel>> {
    Ok(OrderMessages::find()
        .filter(MessageCol::OrderId.eq(order_id))
        .order_by_asc(MessageCol::CreatedAt)
        .order_by_asc(MessageCol::Id)
        .all(db)
        .await?)
}

/// Timeline entries in the order they were appended.
pub async fn logs_for<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<Vec<StatusLogModel>> {
    Ok(OrderStatusLogs::find()
        .filter(StatusLogCol::OrderId.eq(order_id))
        .order_by_asc(StatusLogCol::CreatedAt)
        .order_by_asc(StatusLogCol::Id)
        .all(db)
        .await?)
}

/// Append one timeline entry. Never touches the order row.
pub async fn append_log<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    status: StatusLogKind,
    description: Option<String>,
    metadata: Option<Value>,
) -> AppResult<StatusLogModel> {
    let log = StatusLogActive {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        status: Set(status),
        description: Set(description),
        metadata: Set(metadata),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(log)
}

pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Trimmed message body, or `BadRequest` when empty or too long.
pub fn message_body(raw: &str) -> AppResult<String> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }
    if body.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest(format!(
            "message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(body.to_string())
}

pub async fn insert_message<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    message: String,
    is_incident: bool,
    from_customer: bool,
) -> AppResult<MessageModel> {
    let message = MessageActive {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        message: Set(message),
        is_incident: Set(is_incident),
        from_customer: Set(from_customer),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await?;
    Ok(message)
}

/// Statuses in `from` that the lifecycle table lets move to `target`. The
/// order left exactly one of these when a transition succeeds.
pub fn allowed_predecessors(from: &[OrderStatus], target: OrderStatus) -> Vec<OrderStatus> {
    from.iter()
        .copied()
        .filter(|status| status.can_transition_to(target))
        .collect()
}

/// Compare-and-set status change.
///
/// `changes` is applied together with the new status only while the stored
/// status is one of `from` (narrowed to what the lifecycle table allows).
/// Returns `false` when another writer already moved the order, which makes
/// repeated or out-of-order deliveries harmless.
pub async fn transition<C: ConnectionTrait>(
    db: &C,
    order_id: Uuid,
    from: &[OrderStatus],
    target: OrderStatus,
    mut changes: OrderActive,
) -> AppResult<bool> {
    let allowed = allowed_predecessors(from, target);
    if allowed.is_empty() {
        return Ok(false);
    }

    changes.status = Set(target);
    changes.updated_at = Set(Utc::now().into());

    let result = Orders::update_many()
        .set(changes)
        .filter(OrderCol::Id.eq(order_id))
        .filter(OrderCol::Status.is_in(allowed.clone()))
        .exec(db)
        .await?;

    let moved = result.rows_affected == 1;
    if moved {
        tracing::info!(
            %order_id,
            allowed_from = ?allowed,
            to = target.as_str(),
            "order status changed"
        );
    }
    Ok(moved)
}

use std::collections::BTreeMap;

use chrono::{TimeDelta, Utc};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, prelude::DateTimeWithTimeZone, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::{
        events::Metrics,
        orders::{OperatorMessageRequest, OrderDetail, OrderList},
    },
    entity::{
        Events, Orders,
        events::Column as EventCol,
        orders::Column as OrderCol,
        sea_orm_active_enums::{EventKind, OrderStatus},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderMessage, Shipment, StatusLog},
    order_number,
    response::ApiResponse,
    routes::params::{OrderListQuery, PendingOrdersQuery, SortOrder},
    services::order_store,
    state::AppState,
};

const DEFAULT_PENDING_HOURS: i64 = 24;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let mut any = Condition::any().add(OrderCol::CustomerEmail.eq(q.to_lowercase()));
        if let Some(number) = order_number::normalize(q) {
            any = any.add(OrderCol::OrderNumber.eq(number));
        }
        condition = condition.add(any);
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::paged("Orders", OrderList { items: orders }, page, limit, total))
}

pub async fn get_order_detail(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let order = order_store::get_order(&state.orm, id).await?;
    let items = order_store::items_for(&state.orm, id).await?;
    let shipments = order_store::shipments_for(&state.orm, id)
        .await?
        .into_iter()
        .map(|shipment| {
            let item_ids = items
                .iter()
                .filter(|item| item.shipment_id == Some(shipment.id))
                .map(|item| item.id)
                .collect();
            Shipment::from_entity(shipment, item_ids)
        })
        .collect();
    let status_logs = order_store::logs_for(&state.orm, id)
        .await?
        .into_iter()
        .map(StatusLog::from)
        .collect();
    let messages = order_store::messages_for(&state.orm, id)
        .await?
        .into_iter()
        .map(OrderMessage::from)
        .collect();

    let data = OrderDetail {
        order: order.into(),
        items: items.into_iter().map(OrderItem::from).collect(),
        shipments,
        status_logs,
        messages,
    };
    Ok(ApiResponse::item("Order found", data))
}

pub async fn reply_message(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: OperatorMessageRequest,
) -> AppResult<ApiResponse<OrderMessage>> {
    ensure_admin(user)?;
    let body = order_store::message_body(&payload.message)?;
    order_store::get_order(&state.orm, id).await?;

    let message = order_store::insert_message(&state.orm, id, body, false, false).await?;
    tracing::info!(order_id = %id, by = %user.subject, "operator replied");
    Ok(ApiResponse::item("Message sent", message.into()))
}

/// Orders still `pending` after `older_than_hours`: checkouts whose payment
/// session was opened but never completed or expired. Read-only.
pub async fn pending_report(
    state: &AppState,
    user: &AuthUser,
    query: PendingOrdersQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let hours = query.older_than_hours.unwrap_or(DEFAULT_PENDING_HOURS);
    if hours < 0 {
        return Err(AppError::BadRequest("older_than_hours must not be negative".into()));
    }
    let cutoff: DateTimeWithTimeZone = TimeDelta::try_hours(hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| AppError::BadRequest("older_than_hours is out of range".into()))?
        .into();
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::Pending))
        .filter(OrderCol::CreatedAt.lte(cutoff))
        .order_by_asc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::paged(
        "Pending orders",
        OrderList { items: orders },
        page,
        limit,
        total,
    ))
}

#[derive(Debug, FromQueryResult)]
struct EventCount {
    name: EventKind,
    count: i64,
}

#[derive(Debug, FromQueryResult)]
struct StatusCount {
    status: OrderStatus,
    count: i64,
}

pub async fn metrics(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Metrics>> {
    ensure_admin(user)?;

    let events = Events::find()
        .select_only()
        .column(EventCol::Name)
        .column_as(Expr::col(EventCol::Id).count(), "count")
        .group_by(EventCol::Name)
        .into_model::<EventCount>()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|row| (row.name.as_str().to_string(), row.count))
        .collect::<BTreeMap<_, _>>();

    let orders_by_status = Orders::find()
        .select_only()
        .column(OrderCol::Status)
        .column_as(Expr::col(OrderCol::Id).count(), "count")
        .group_by(OrderCol::Status)
        .into_model::<StatusCount>()
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|row| (row.status.as_str().to_string(), row.count))
        .collect::<BTreeMap<_, _>>();

    Ok(ApiResponse::item(
        "Metrics",
        Metrics {
            events,
            orders_by_status,
        },
    ))
}

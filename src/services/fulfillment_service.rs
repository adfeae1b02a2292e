use std::collections::BTreeSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::fulfillment::{
        AppendStatusLogRequest, CreateShipmentRequest, OrderActionRequest, OrderActionResponse,
        ShipmentList, StatusLogList,
    },
    entity::{
        OrderItems,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        shipments::ActiveModel as ShipmentActive,
        sea_orm_active_enums::StatusLogKind,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Shipment, StatusLog},
    response::ApiResponse,
    services::order_store,
    state::AppState,
};

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Dispatch a subset of an order's items. The shipment row, the item flags
/// and the `shipped` log entry are written in one transaction.
pub async fn create_shipment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: CreateShipmentRequest,
) -> AppResult<ApiResponse<Shipment>> {
    ensure_admin(user)?;
    let item_ids: BTreeSet<Uuid> = payload.item_ids.into_iter().collect();
    if item_ids.is_empty() {
        return Err(AppError::BadRequest("item_ids must not be empty".into()));
    }
    let item_ids: Vec<Uuid> = item_ids.into_iter().collect();
    let tracking_number = clean(payload.tracking_number);
    let carrier = clean(payload.carrier);

    let txn = state.orm.begin().await?;
    let order = order_store::get_order(&txn, order_id).await?;
    if !order.status.is_paid() {
        return Err(AppError::Conflict(format!(
            "order is {}, only paid orders can ship",
            order.status.as_str()
        )));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::Id.is_in(item_ids.clone()))
        .all(&txn)
        .await?;
    if items.len() != item_ids.len() {
        return Err(AppError::BadRequest(
            "every item must belong to the order".into(),
        ));
    }
    if items.iter().any(|item| item.shipped) {
        return Err(AppError::Conflict("item already shipped".into()));
    }

    let now = Utc::now();
    let shipment = ShipmentActive {
        id: Set(Uuid::now_v7()),
        order_id: Set(order_id),
        tracking_number: Set(tracking_number.clone()),
        carrier: Set(carrier.clone()),
        shipped_at: Set(Some(now.into())),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut mark: OrderItemActive = Default::default();
    mark.shipped = Set(true);
    mark.shipped_at = Set(Some(now.into()));
    mark.shipment_id = Set(Some(shipment.id));
    let result = OrderItems::update_many()
        .set(mark)
        .filter(OrderItemCol::OrderId.eq(order_id))
        .filter(OrderItemCol::Id.is_in(item_ids.clone()))
        .filter(OrderItemCol::ShipmentId.is_null())
        .exec(&txn)
        .await?;
    if result.rows_affected != item_ids.len() as u64 {
        return Err(AppError::Conflict("item already shipped".into()));
    }

    order_store::append_log(
        &txn,
        order_id,
        StatusLogKind::Shipped,
        tracking_number
            .as_ref()
            .map(|number| format!("Tracking number {number}")),
        Some(serde_json::json!({
            "shipment_id": shipment.id,
            "item_ids": item_ids,
            "carrier": carrier,
            "tracking_number": tracking_number,
        })),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(%order_id, shipment_id = %shipment.id, items = item_ids.len(), "shipment created");
    Ok(ApiResponse::item(
        "Shipment created",
        Shipment::from_entity(shipment, item_ids),
    ))
}

pub async fn list_shipments(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<ShipmentList>> {
    ensure_admin(user)?;
    order_store::get_order(&state.orm, order_id).await?;
    let items = order_store::items_for(&state.orm, order_id).await?;
    let shipments = order_store::shipments_for(&state.orm, order_id)
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

    Ok(ApiResponse::item("OK", ShipmentList { items: shipments }))
}

/// Raw timeline append. Never changes the order status; use
/// [`apply_action`] for entries that should.
pub async fn append_status_log(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: AppendStatusLogRequest,
) -> AppResult<ApiResponse<StatusLog>> {
    ensure_admin(user)?;
    order_store::get_order(&state.orm, order_id).await?;
    let log = order_store::append_log(
        &state.orm,
        order_id,
        payload.status,
        clean(payload.description),
        payload.metadata,
    )
    .await?;
    Ok(ApiResponse::item("Status log appended", log.into()))
}

pub async fn list_status_logs(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<StatusLogList>> {
    ensure_admin(user)?;
    order_store::get_order(&state.orm, order_id).await?;
    let items = order_store::logs_for(&state.orm, order_id)
        .await?
        .into_iter()
        .map(StatusLog::from)
        .collect();
    Ok(ApiResponse::item("OK", StatusLogList { items }))
}

/// Named operator action: one timeline entry, plus the status change the
/// cascade table assigns to its kind. Illegal changes are refused without
/// writing anything.
pub async fn apply_action(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: OrderActionRequest,
) -> AppResult<ApiResponse<OrderActionResponse>> {
    ensure_admin(user)?;
    let kind = payload.action.log_kind();
    let description = clean(payload.description);
    let order = order_store::get_order(&state.orm, order_id).await?;

    let txn = state.orm.begin().await?;
    if let Some(target) = payload.action.target_status() {
        if order.status != target {
            if !order.status.can_transition_to(target) {
                return Err(AppError::Conflict(format!(
                    "cannot move a {} order to {}",
                    order.status.as_str(),
                    target.as_str()
                )));
            }
            let moved = order_store::transition(
                &txn,
                order_id,
                &[order.status],
                target,
                Default::default(),
            )
            .await?;
            if !moved {
                return Err(AppError::Conflict("order changed concurrently, retry".into()));
            }
        }
    }
    let log = order_store::append_log(
        &txn,
        order_id,
        kind,
        description,
        Some(serde_json::json!({ "action": payload.action, "by": user.subject })),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(%order_id, action = ?payload.action, "order action applied");
    let order = order_store::get_order(&state.orm, order_id).await?;
    Ok(ApiResponse::item(
        "Action applied",
        OrderActionResponse {
            order: Order::from(order),
            log: log.into(),
        },
    ))
}

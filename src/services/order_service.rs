use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CustomerMessageRequest, ReconcileRequest, ReconcileResponse, TrackedItem,
        TrackedShipment, TrackingQuery, TrackingView,
    },
    entity::{
        Orders,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        sea_orm_active_enums::OrderStatus,
    },
    error::{AppError, AppResult},
    models::OrderMessage,
    order_number,
    response::ApiResponse,
    services::order_store,
    state::AppState,
};

fn reconcile_view(order: OrderModel) -> ReconcileResponse {
    ReconcileResponse {
        order_id: order.id,
        order_number: order.order_number,
        waiting_for_webhook: order.status == OrderStatus::Pending,
        status: order.status,
    }
}

/// Called by the browser after the hosted payment page redirects back.
/// Backfills a missing session id but never changes the order status.
pub async fn reconcile_status(
    state: &AppState,
    order_id: Uuid,
    payload: ReconcileRequest,
) -> AppResult<ApiResponse<ReconcileResponse>> {
    let session_id = payload.session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::BadRequest("session_id is required".into()));
    }

    let order = order_store::get_order(&state.orm, order_id).await?;

    if order.status.is_paid() {
        return Ok(ApiResponse::item("Order confirmed", reconcile_view(order)));
    }

    if !order_store::is_placeholder_session(&order.stripe_session_id) {
        if order.stripe_session_id != session_id {
            return Err(AppError::NotFound);
        }
        return Ok(ApiResponse::item("Order status", reconcile_view(order)));
    }

    // Only bind a session the provider says was opened for this order.
    let session = match state.payments.retrieve_session(session_id).await {
        Ok(session) => session,
        Err(err) => {
            tracing::warn!(%order_id, error = %err, "session lookup failed, leaving placeholder");
            return Ok(ApiResponse::item("Order status", reconcile_view(order)));
        }
    };
    if session.client_reference_id.as_deref() != Some(order.id.to_string().as_str()) {
        return Err(AppError::NotFound);
    }

    let mut bind: OrderActive = Default::default();
    bind.stripe_session_id = Set(session.id);
    bind.updated_at = Set(Utc::now().into());
    let result = Orders::update_many()
        .set(bind)
        .filter(OrderCol::Id.eq(order.id))
        .filter(OrderCol::StripeSessionId.eq(order.stripe_session_id.as_str()))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 1 {
        tracing::info!(%order_id, "session id backfilled");
    }

    let order = order_store::get_order(&state.orm, order_id).await?;
    Ok(ApiResponse::item("Order status", reconcile_view(order)))
}

/// Customer-safe projection of an order. Contact and address fields are
/// never read from the record.
pub async fn tracking_view(state: &AppState, order: OrderModel) -> AppResult<TrackingView> {
    let items = order_store::items_for(&state.orm, order.id).await?;
    let shipments = order_store::shipments_for(&state.orm, order.id).await?;
    let messages = order_store::messages_for(&state.orm, order.id).await?;

    let shipments = shipments
        .into_iter()
        .map(|shipment| TrackedShipment {
            item_count: items
                .iter()
                .filter(|item| item.shipment_id == Some(shipment.id))
                .count(),
            tracking_number: shipment.tracking_number,
            carrier: shipment.carrier,
            shipped_at: shipment.shipped_at.map(|dt| dt.with_timezone(&Utc)),
        })
        .collect();

    Ok(TrackingView {
        order_number: order.order_number,
        status: order.status,
        total: order.total,
        shipping_cost: order.shipping_cost,
        currency: order.currency,
        created_at: order.created_at.with_timezone(&Utc),
        completed_at: order.completed_at.map(|dt| dt.with_timezone(&Utc)),
        items: items
            .into_iter()
            .map(|item| TrackedItem {
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
                variety: item.variety,
                preorder: item.preorder,
                shipped: item.shipped,
            })
            .collect(),
        shipments,
        messages: messages.into_iter().map(OrderMessage::from).collect(),
    })
}

/// Malformed and unknown numbers get the same `NotFound`.
async fn order_by_public_number(state: &AppState, raw: &str) -> AppResult<OrderModel> {
    let number = order_number::normalize(raw).ok_or(AppError::NotFound)?;
    order_store::find_by_number(&state.orm, &number)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn track_order(
    state: &AppState,
    query: TrackingQuery,
) -> AppResult<ApiResponse<TrackingView>> {
    let order = order_by_public_number(state, &query.order_number).await?;
    Ok(ApiResponse::item("OK", tracking_view(state, order).await?))
}

pub async fn post_customer_message(
    state: &AppState,
    raw_number: &str,
    payload: CustomerMessageRequest,
) -> AppResult<ApiResponse<OrderMessage>> {
    let body = order_store::message_body(&payload.message)?;
    let order = order_by_public_number(state, raw_number).await?;

    let message =
        order_store::insert_message(&state.orm, order.id, body, payload.is_incident, true).await?;
    if payload.is_incident {
        tracing::warn!(order_id = %order.id, "customer reported an incident");
    }

    Ok(ApiResponse::item("Message sent", message.into()))
}

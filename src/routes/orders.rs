use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CustomerMessageRequest, ReconcileRequest, ReconcileResponse, TrackingQuery, TrackingView,
    },
    error::AppResult,
    models::OrderMessage,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/track", get(track_order))
        .route("/by-number/{number}/messages", post(post_customer_message))
        .route("/{id}/update-status", post(reconcile_status))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/update-status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Current order status; never advanced by this call", body = ApiResponse<ReconcileResponse>),
        (status = 404, description = "Not Found")
    ),
    tag = "Orders"
)]
pub async fn reconcile_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReconcileRequest>,
) -> AppResult<Json<ApiResponse<ReconcileResponse>>> {
    let resp = order_service::reconcile_status(&state, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/track",
    params(
        ("orderNumber" = String, Query, description = "Order number, case-insensitive")
    ),
    responses(
        (status = 200, description = "Public tracking view", body = ApiResponse<TrackingView>),
        (status = 404, description = "Not Found")
    ),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Query(query): Query<TrackingQuery>,
) -> AppResult<Json<ApiResponse<TrackingView>>> {
    let resp = order_service::track_order(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/by-number/{number}/messages",
    params(
        ("number" = String, Path, description = "Order number")
    ),
    request_body = CustomerMessageRequest,
    responses(
        (status = 200, description = "Message appended to the order thread", body = ApiResponse<OrderMessage>),
        (status = 400, description = "Empty or oversized message"),
        (status = 404, description = "Not Found")
    ),
    tag = "Orders"
)]
pub async fn post_customer_message(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(payload): Json<CustomerMessageRequest>,
) -> AppResult<Json<ApiResponse<OrderMessage>>> {
    let resp = order_service::post_customer_message(&state, &number, payload).await?;
    Ok(Json(resp))
}

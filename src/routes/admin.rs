use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        events::Metrics,
        orders::{OperatorMessageRequest, OrderDetail, OrderList},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderMessage,
    response::ApiResponse,
    routes::{
        auth,
        params::{OrderListQuery, PendingOrdersQuery},
    },
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::admin_login))
        .route("/orders", get(list_all_orders))
        .route("/orders/pending", get(pending_orders))
        .route("/orders/{id}", get(get_order_detail))
        .route("/orders/{id}/messages", post(reply_message))
        .route("/metrics", get(metrics))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("q" = Option<String>, Query, description = "Order number or customer email"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
    (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Forbidden"),
    (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/pending",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("older_than_hours" = Option<i64>, Query, description = "Minimum age, default 24")
    ),
    responses(
    (status = 200, description = "Pending orders whose payment never settled", body = ApiResponse<OrderList>),
    (status = 401, description = "Unauthorized"),
    (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn pending_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PendingOrdersQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::pending_report(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
    (
        "id" = Uuid, Path, description = "Order ID")
    ),
    responses(
    (status = 200, description = "Full order with items, shipments, timeline and messages", body = ApiResponse<OrderDetail>),
    (status = 404, description = "Not Found", ),
    (status = 403, description = "Forbidden", ),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"

)]
pub async fn get_order_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = admin_service::get_order_detail(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/messages",
    params(
    (
        "id" = Uuid, Path, description = "Order ID")
    ),
    request_body = OperatorMessageRequest,
    responses(
        (status = 200, description = "Operator reply appended", body = ApiResponse<OrderMessage>),
        (status = 400, description = "Empty or oversized message"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reply_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OperatorMessageRequest>,
) -> AppResult<Json<ApiResponse<OrderMessage>>> {
    let resp = admin_service::reply_message(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/metrics",
    responses(
        (status = 200, description = "Event counts per kind and order counts per status", body = ApiResponse<Metrics>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn metrics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Metrics>>> {
    let resp = admin_service::metrics(&state, &user).await?;
    Ok(Json(resp))
}

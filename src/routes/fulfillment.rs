use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::fulfillment::{
        AppendStatusLogRequest, CreateShipmentRequest, OrderActionRequest, OrderActionResponse,
        ShipmentList, StatusLogList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Shipment, StatusLog},
    response::ApiResponse,
    services::fulfillment_service,
    state::AppState,
};

/// Operator-only routes nested under `/orders`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/shipments", get(list_shipments).post(create_shipment))
        .route(
            "/{id}/status-logs",
            get(list_status_logs).post(append_status_log),
        )
        .route("/{id}/actions", post(apply_action))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/shipments",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created and items marked shipped", body = ApiResponse<Shipment>),
        (status = 400, description = "Empty item list or item from another order"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Order not paid or item already shipped")
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateShipmentRequest>,
) -> AppResult<Json<ApiResponse<Shipment>>> {
    let resp = fulfillment_service::create_shipment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/shipments",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Shipments with the items each one covers", body = ApiResponse<ShipmentList>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ShipmentList>>> {
    let resp = fulfillment_service::list_shipments(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/status-logs",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AppendStatusLogRequest,
    responses(
        (status = 200, description = "Entry appended; order status untouched", body = ApiResponse<StatusLog>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn append_status_log(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AppendStatusLogRequest>,
) -> AppResult<Json<ApiResponse<StatusLog>>> {
    let resp = fulfillment_service::append_status_log(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/status-logs",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Timeline in append order", body = ApiResponse<StatusLogList>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn list_status_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StatusLogList>>> {
    let resp = fulfillment_service::list_status_logs(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/actions",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = OrderActionRequest,
    responses(
        (status = 200, description = "Action logged and status updated where applicable", body = ApiResponse<OrderActionResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    security(("bearer_auth" = [])),
    tag = "Fulfillment"
)]
pub async fn apply_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderActionRequest>,
) -> AppResult<Json<ApiResponse<OrderActionResponse>>> {
    let resp = fulfillment_service::apply_action(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

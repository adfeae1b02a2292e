use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::AppResult,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_checkout))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Pending order and hosted payment session created", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, missing country or unknown product"),
        (status = 502, description = "Payment provider unavailable")
    ),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::create_session(&state, payload).await?;
    Ok(Json(resp))
}

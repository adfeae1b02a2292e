use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::webhooks::WebhookAck,
    error::AppResult,
    response::ApiResponse,
    services::webhook_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/payment", post(payment_webhook))
}

/// The body is taken as raw bytes: the signature covers the exact payload.
#[utoipa::path(
    post,
    path = "/api/webhooks/payment",
    request_body(content = String, content_type = "application/json", description = "Provider event, signed"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Bad signature or malformed payload"),
        (status = 500, description = "Store unavailable; the provider retries")
    ),
    tag = "Webhooks"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = webhook_service::handle_webhook(&state, &body, signature).await?;
    Ok(Json(resp))
}

use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::chat::{ChatRequest, ChatResponse},
    error::AppResult,
    response::ApiResponse,
    services::chat_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chat))
}

#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ApiResponse<ChatResponse>),
        (status = 400, description = "Empty or oversized message"),
        (status = 502, description = "Assistant unavailable")
    ),
    tag = "Chat"
)]
pub async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> AppResult<Json<ApiResponse<ChatResponse>>> {
    let resp = chat_service::chat(&state, payload).await?;
    Ok(Json(resp))
}

use axum::{Json, extract::State};

use crate::{
    dto::auth::{AdminLoginRequest, LoginResponse},
    error::AppResult,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Operator bearer token", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::admin_login(&state, payload).await?;
    Ok(Json(resp))
}

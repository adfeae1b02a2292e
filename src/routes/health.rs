use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{response::ApiResponse, state::AppState};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
        (status = 503, description = "Database unreachable", body = ApiResponse<HealthData>),
    ),
        tag = "Health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthData>>) {
    let (code, status, database) = match state.orm.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "up"),
        Err(err) => {
            tracing::error!(error = %err, "database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };

    let data = HealthData {
        status: status.to_string(),
        database: database.to_string(),
    };

    (code, Json(ApiResponse::item("Health check", data)))
}

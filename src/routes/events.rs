use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::events::TrackEventRequest,
    error::{AppError, AppResult},
    state::AppState,
    telemetry,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(track_event))
}

/// Storefront analytics. Stored best-effort; a failed write is not reported.
#[utoipa::path(
    post,
    path = "/api/events",
    request_body = TrackEventRequest,
    responses(
        (status = 202, description = "Event accepted"),
        (status = 400, description = "Event kind is server-only")
    ),
    tag = "Events"
)]
pub async fn track_event(
    State(state): State<AppState>,
    Json(payload): Json<TrackEventRequest>,
) -> AppResult<StatusCode> {
    if !payload.name.client_reportable() {
        return Err(AppError::BadRequest(format!(
            "{} events are recorded by the server",
            payload.name.as_str()
        )));
    }
    telemetry::record(
        &state.orm,
        payload.name,
        payload.metadata.unwrap_or(serde_json::Value::Null),
    )
    .await;
    Ok(StatusCode::ACCEPTED)
}

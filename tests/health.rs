mod common;

use avocado_shop_api::routes::health::health_check;
use axum::{extract::State, http::StatusCode};

#[tokio::test]
async fn health_check_reports_database_up() -> anyhow::Result<()> {
    let app = common::setup().await?;
    let (code, response) = health_check(State(app.state.clone())).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
    Ok(())
}

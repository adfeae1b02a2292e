use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod chat;
pub mod checkout;
pub mod doc;
pub mod events;
pub mod fulfillment;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod webhooks;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/checkout", checkout::router())
        .nest("/webhooks", webhooks::router())
        .nest("/orders", orders::router().merge(fulfillment::router()))
        .nest("/admin", admin::router())
        .nest("/chat", chat::router())
        .nest("/events", events::router())
}

use serde::Serialize;
use utoipa::ToSchema;

/// What a delivered event did to the store. Every variant is acknowledged with 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    Created,
    AlreadyApplied,
    OrderNotFound,
    Recorded,
    Ignored,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub event_id: String,
    pub event_type: String,
    pub outcome: WebhookOutcome,
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::entity::sea_orm_active_enums::EventKind;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackEventRequest {
    pub name: EventKind,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Metrics {
    pub events: BTreeMap<String, i64>,
    pub orders_by_status: BTreeMap<String, i64>,
}

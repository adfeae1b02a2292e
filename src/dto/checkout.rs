use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i32,
    pub variety: Option<String>,
}

/// Cart as posted by the storefront. Prices are never taken from here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub items: Vec<CartLine>,
    pub country: Option<String>,
    /// Minor units, computed by the storefront's shipping table.
    #[serde(default)]
    pub shipping_cost: i64,
    #[serde(default)]
    pub shipping_weight_grams: i32,
    pub locale: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
    pub order_id: Uuid,
    pub order_number: String,
}

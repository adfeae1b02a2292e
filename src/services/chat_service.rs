use std::sync::LazyLock;

use chrono::{Datelike, Utc};
use regex::Regex;

use crate::{
    completion::ChatTurn,
    dto::{
        chat::{ChatRequest, ChatResponse},
        orders::TrackingView,
    },
    entity::sea_orm_active_enums::EventKind,
    error::{AppError, AppResult},
    order_number,
    response::ApiResponse,
    services::{checkout_service, order_service, order_store, product_service},
    state::AppState,
    telemetry,
};

pub const MAX_HISTORY_TURNS: usize = 10;

static ORDER_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[A-Z]{3}[A-Z0-9]{9}\b").expect("static pattern"));

/// First token in `message` shaped like one of our order numbers, uppercased.
pub fn find_order_number(message: &str, prefix: &str) -> Option<String> {
    ORDER_NUMBER_RE
        .find_iter(message)
        .filter_map(|m| order_number::normalize(m.as_str()))
        .find(|candidate| candidate.starts_with(prefix))
}

fn catalog_context(products: &[crate::entity::products::Model], month: u32) -> String {
    let mut out = String::from("Products:\n");
    for product in products {
        let availability = if product_service::in_season(product, month) {
            "in season"
        } else {
            "preorder"
        };
        out.push_str(&format!(
            "- {} ({}): {:.2}, {} g, {}\n",
            product.name,
            product.variety.as_deref().unwrap_or("mixed"),
            product.price as f64 / 100.0,
            product.weight_grams,
            availability,
        ));
    }
    out
}

fn order_context(view: &TrackingView) -> String {
    let shipped = view.items.iter().filter(|item| item.shipped).count();
    let tracking: Vec<&str> = view
        .shipments
        .iter()
        .filter_map(|s| s.tracking_number.as_deref())
        .collect();
    format!(
        "Order {}: status {}, total {:.2} {}, {} of {} items shipped, tracking: {}\n",
        view.order_number,
        view.status.as_str(),
        view.total as f64 / 100.0,
        view.currency.to_uppercase(),
        shipped,
        view.items.len(),
        if tracking.is_empty() {
            "none yet".to_string()
        } else {
            tracking.join(", ")
        },
    )
}

pub fn system_prompt(locale: &str, catalog: &str, order: Option<&str>) -> String {
    let mut prompt = format!(
        "You are the support assistant of a family avocado farm that ships boxes of Hass \
         and Lamb Hass avocados. Answer briefly in the customer's language (locale: {locale}). \
         Only use the facts below; if you do not know, suggest contacting the farm through \
         the order page.\n\n{catalog}"
    );
    if let Some(order) = order {
        prompt.push('\n');
        prompt.push_str(order);
    }
    prompt
}

pub async fn chat(state: &AppState, payload: ChatRequest) -> AppResult<ApiResponse<ChatResponse>> {
    let message = order_store::message_body(&payload.message)?;
    let locale = checkout_service::normalize_locale(payload.locale.as_deref());

    let month = Utc::now().month();
    let products = product_service::active_catalog(&state.orm).await?;
    let catalog = catalog_context(&products, month);

    let order = match find_order_number(&message, &state.config.order_number_prefix) {
        Some(number) => match order_store::find_by_number(&state.orm, &number).await? {
            Some(order) => Some(order_context(
                &order_service::tracking_view(state, order).await?,
            )),
            None => Some(format!("Order {number}: not found\n")),
        },
        None => None,
    };

    let skip = payload.history.len().saturating_sub(MAX_HISTORY_TURNS);
    let history: &[ChatTurn] = &payload.history[skip..];

    let system = system_prompt(&locale, &catalog, order.as_deref());
    let reply = state
        .completion
        .complete(&system, history, &message)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "completion failed");
            AppError::from(err)
        })?;

    telemetry::record(
        &state.orm,
        EventKind::ChatbotUsed,
        serde_json::json!({ "locale": locale, "order_lookup": order.is_some() }),
    )
    .await;

    Ok(ApiResponse::item("OK", ChatResponse { reply }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_order_numbers_in_free_text() {
        assert_eq!(
            find_order_number("hi, where is avo1a2b3c4d5?", "AVO"),
            Some("AVO1A2B3C4D5".to_string())
        );
        assert_eq!(find_order_number("my order is late", "AVO"), None);
        assert_eq!(find_order_number("AVO123", "AVO"), None);
        assert_eq!(find_order_number("availability", "AVO"), None);
    }

    #[test]
    fn prompt_includes_order_facts_only_when_present() {
        let prompt = system_prompt("es", "Products:\n", None);
        assert!(prompt.contains("locale: es"));
        assert!(!prompt.contains("Order "));
        let prompt = system_prompt("en", "Products:\n", Some("Order AVO1: status completed"));
        assert!(prompt.ends_with("Order AVO1: status completed"));
    }
}

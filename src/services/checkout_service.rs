use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, Utc};
use reqwest::Url;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dto::checkout::{CartLine, CheckoutRequest, CheckoutResponse},
    entity::{
        Orders,
        order_items::ActiveModel as OrderItemActive,
        orders::{ActiveModel as OrderActive, Column as OrderCol},
        products::Model as ProductModel,
        sea_orm_active_enums::{EventKind, OrderStatus, StatusLogKind},
    },
    error::{AppError, AppResult, CheckoutError},
    order_number,
    payments::{CheckoutSessionRequest, LineItem},
    response::ApiResponse,
    services::{order_store, product_service},
    state::AppState,
    telemetry,
};

const MAX_QUANTITY: i32 = 99;
/// Upper bound for the client-quoted shipping cost, in minor units.
pub const MAX_SHIPPING_COST: i64 = 100_000;
const METADATA_VALUE_LIMIT: usize = 500;
const SUPPORTED_LOCALES: [&str; 7] = ["en", "es", "de", "fr", "it", "nl", "pt"];

/// A cart line resolved against the catalog.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: String,
    pub name: String,
    pub variety: Option<String>,
    pub quantity: i32,
    pub unit_price: i64,
    pub preorder: bool,
}

/// Cart context carried through the hosted checkout as session metadata, so
/// the webhook can still see it after the customer leaves the site.
#[derive(Debug, Clone, PartialEq)]
pub struct CartContext {
    pub order_id: Uuid,
    pub order_number: String,
    pub items: Vec<CartLine>,
    pub country: String,
    pub weight_grams: i32,
    pub multi_variety: bool,
    pub out_of_season: bool,
}

#[derive(Serialize, Deserialize)]
struct CompactLine {
    p: String,
    q: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    v: Option<String>,
}

impl CartContext {
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();
        meta.insert("order_id".into(), self.order_id.to_string());
        meta.insert("order_number".into(), self.order_number.clone());
        meta.insert("country".into(), self.country.clone());
        meta.insert("weight_grams".into(), self.weight_grams.to_string());
        meta.insert("multi_variety".into(), self.multi_variety.to_string());
        meta.insert("out_of_season".into(), self.out_of_season.to_string());

        let compact: Vec<CompactLine> = self
            .items
            .iter()
            .map(|line| CompactLine {
                p: line.product_id.clone(),
                q: line.quantity,
                v: line.variety.clone(),
            })
            .collect();
        match serde_json::to_string(&compact) {
            Ok(items) if items.len() <= METADATA_VALUE_LIMIT => {
                meta.insert("items".into(), items);
            }
            _ => tracing::warn!(order_id = %self.order_id, "cart too large for session metadata"),
        }
        meta
    }

    pub fn from_metadata(meta: &HashMap<String, String>) -> Option<Self> {
        let order_id = meta.get("order_id")?.parse().ok()?;
        let items = meta
            .get("items")
            .and_then(|raw| serde_json::from_str::<Vec<CompactLine>>(raw).ok())
            .unwrap_or_default()
            .into_iter()
            .map(|line| CartLine {
                product_id: line.p,
                quantity: line.q,
                variety: line.v,
            })
            .collect();
        Some(Self {
            order_id,
            order_number: meta.get("order_number").cloned().unwrap_or_default(),
            items,
            country: meta.get("country").cloned().unwrap_or_default(),
            weight_grams: meta
                .get("weight_grams")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            multi_variety: meta.get("multi_variety").is_some_and(|v| v == "true"),
            out_of_season: meta.get("out_of_season").is_some_and(|v| v == "true"),
        })
    }
}

/// Validate the cart shape before touching the store.
pub fn validate_cart(payload: &CheckoutRequest) -> Result<String, CheckoutError> {
    if payload.items.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let country = payload
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or(CheckoutError::MissingCountry)?;
    if payload
        .items
        .iter()
        .any(|line| line.quantity < 1 || line.quantity > MAX_QUANTITY)
    {
        return Err(CheckoutError::InvalidQuantity);
    }
    if !(0..=MAX_SHIPPING_COST).contains(&payload.shipping_cost) {
        return Err(CheckoutError::InvalidShippingCost);
    }
    Ok(country.to_lowercase())
}

/// Price every line from the catalog snapshot. Client prices are never read.
pub fn price_cart(
    lines: &[CartLine],
    catalog: &HashMap<String, ProductModel>,
    month: u32,
) -> Result<Vec<PricedLine>, CheckoutError> {
    lines
        .iter()
        .map(|line| {
            let product = catalog
                .get(&line.product_id)
                .ok_or_else(|| CheckoutError::UnknownProduct(line.product_id.clone()))?;
            let variety = line
                .variety
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| product.variety.clone());
            Ok(PricedLine {
                product_id: product.id.clone(),
                name: product.name.clone(),
                variety,
                quantity: line.quantity,
                unit_price: product.price,
                preorder: !product_service::in_season(product, month),
            })
        })
        .collect()
}

pub fn is_multi_variety(lines: &[PricedLine]) -> bool {
    lines
        .iter()
        .filter_map(|line| line.variety.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
        > 1
}

/// Provider line items: one per cart line, plus shipping when it costs anything.
pub fn build_line_items(lines: &[PricedLine], shipping_cost: i64) -> Vec<LineItem> {
    let mut items: Vec<LineItem> = lines
        .iter()
        .map(|line| LineItem {
            name: line.name.clone(),
            description: line.preorder.then(|| match &line.variety {
                Some(variety) => format!("Preorder: ships when the {variety} harvest opens"),
                None => "Preorder: ships when the harvest opens".to_string(),
            }),
            unit_amount: line.unit_price,
            quantity: line.quantity,
        })
        .collect();
    if shipping_cost > 0 {
        items.push(LineItem {
            name: "Shipping".to_string(),
            description: None,
            unit_amount: shipping_cost,
            quantity: 1,
        });
    }
    items
}

/// Sum of the provider line items.
pub fn order_total(items: &[LineItem]) -> Result<i64, CheckoutError> {
    items.iter().try_fold(0i64, |total, item| {
        item.unit_amount
            .checked_mul(i64::from(item.quantity))
            .and_then(|amount| total.checked_add(amount))
            .ok_or(CheckoutError::TotalOutOfRange)
    })
}

pub fn normalize_locale(locale: Option<&str>) -> String {
    locale
        .map(|l| l.trim().to_lowercase())
        .and_then(|l| l.get(..2).map(str::to_string))
        .filter(|l| SUPPORTED_LOCALES.contains(&l.as_str()))
        .unwrap_or_else(|| "en".to_string())
}

/// Append the order reference to a redirect target. The provider substitutes
/// the literal `{CHECKOUT_SESSION_ID}` template, so it must stay unencoded.
fn with_order_params(mut url: Url, order_id: &str, session_template: bool) -> String {
    if session_template {
        let query = match url.query().filter(|q| !q.is_empty()) {
            Some(existing) => format!("{existing}&session_id={{CHECKOUT_SESSION_ID}}"),
            None => "session_id={CHECKOUT_SESSION_ID}".to_string(),
        };
        url.set_query(Some(&query));
    }
    url.query_pairs_mut().append_pair("order_id", order_id);
    url.into()
}

fn storefront_origin(base: &str) -> Result<Url, AppError> {
    Url::parse(base).map_err(|err| {
        AppError::Internal(anyhow::anyhow!("PUBLIC_BASE_URL is not a valid url: {err}"))
    })
}

/// Redirect targets must share the storefront's scheme, host and port.
fn redirect_url(requested: Option<&str>, base: &Url, default_path: &str) -> Result<Url, AppError> {
    match requested {
        Some(raw) => match Url::parse(raw) {
            Ok(url) if url.origin() == base.origin() => Ok(url),
            _ => Err(AppError::BadRequest(
                "redirect url must point to the storefront".into(),
            )),
        },
        None => {
            let joined = format!("{}{}", base.as_str().trim_end_matches('/'), default_path);
            Url::parse(&joined).map_err(|err| AppError::Internal(err.into()))
        }
    }
}

pub async fn create_session(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let country = validate_cart(&payload)?;
    let locale = normalize_locale(payload.locale.as_deref());
    let base = storefront_origin(&state.config.public_base_url)?;
    let success_base = redirect_url(payload.success_url.as_deref(), &base, "/checkout/success")?;
    let cancel_base = redirect_url(payload.cancel_url.as_deref(), &base, "/checkout/cancel")?;

    let ids = payload
        .items
        .iter()
        .map(|line| line.product_id.clone())
        .collect();
    let catalog = product_service::load_catalog(&state.orm, ids).await?;
    let priced = price_cart(&payload.items, &catalog, Utc::now().month())?;
    let multi_variety = is_multi_variety(&priced);
    let out_of_season = priced.iter().any(|line| line.preorder);
    let line_items = build_line_items(&priced, payload.shipping_cost);
    let total = order_total(&line_items)?;

    let prefix = state.config.order_number_prefix.clone();
    let order_number =
        order_number::allocate(&state.orm, || order_number::generate(&prefix)).await?;
    let order_id = Uuid::now_v7();
    let placeholder = order_store::placeholder_session_id(order_id);
    let now = Utc::now();

    // The order exists before the payment session so its id can travel with it.
    let txn = state.orm.begin().await?;
    OrderActive {
        id: Set(order_id),
        order_number: Set(order_number.clone()),
        stripe_session_id: Set(placeholder.clone()),
        customer_email: Set(None),
        customer_phone: Set(None),
        shipping_name: Set(None),
        shipping_line1: Set(None),
        shipping_line2: Set(None),
        shipping_city: Set(None),
        shipping_state: Set(None),
        shipping_postal_code: Set(None),
        shipping_country: Set(None),
        destination_country: Set(country.clone()),
        locale: Set(locale.clone()),
        shipping_cost: Set(payload.shipping_cost),
        total: Set(total),
        currency: Set(state.config.currency.clone()),
        status: Set(OrderStatus::Pending),
        created_at: Set(now.into()),
        completed_at: Set(None),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    for (position, line) in priced.iter().enumerate() {
        OrderItemActive {
            id: Set(Uuid::now_v7()),
            order_id: Set(order_id),
            position: Set(position as i32),
            product_id: Set(line.product_id.clone()),
            product_name: Set(line.name.clone()),
            variety: Set(line.variety.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            preorder: Set(line.preorder),
            shipped: Set(false),
            shipped_at: Set(None),
            shipment_id: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
    }

    order_store::append_log(
        &txn,
        order_id,
        StatusLogKind::Created,
        None,
        Some(serde_json::json!({ "multi_variety": multi_variety, "out_of_season": out_of_season })),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(%order_id, %order_number, total, "pending order created");

    let context = CartContext {
        order_id,
        order_number: order_number.clone(),
        items: payload.items.clone(),
        country: country.clone(),
        weight_grams: payload.shipping_weight_grams,
        multi_variety,
        out_of_season,
    };
    let order_ref = order_id.to_string();
    let request = CheckoutSessionRequest {
        order_id: order_ref.clone(),
        currency: state.config.currency.clone(),
        line_items,
        success_url: with_order_params(success_base, &order_ref, true),
        cancel_url: with_order_params(cancel_base, &order_ref, false),
        locale,
        shipping_countries: vec![country],
        metadata: context.to_metadata(),
    };

    // A failure here leaves the pending order behind with its placeholder
    // session id; it shows up in the abandoned-orders report.
    let session = match state.payments.create_checkout_session(&request).await {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(%order_id, error = %err, "payment session creation failed");
            return Err(err.into());
        }
    };

    let mut bind: OrderActive = Default::default();
    bind.stripe_session_id = Set(session.id.clone());
    bind.updated_at = Set(Utc::now().into());
    Orders::update_many()
        .set(bind)
        .filter(OrderCol::Id.eq(order_id))
        .filter(OrderCol::StripeSessionId.eq(placeholder))
        .exec(&state.orm)
        .await?;

    telemetry::record(
        &state.orm,
        EventKind::CheckoutStarted,
        serde_json::json!({ "order_id": order_id, "order_number": order_number, "total": total }),
    )
    .await;

    Ok(ApiResponse::item(
        "Checkout session created",
        CheckoutResponse {
            session_id: session.id,
            url: session.url,
            order_id,
            order_number,
        },
    ))
}

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::products::ProductList,
    entity::{
        Products,
        products::{Column as ProdCol, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::Product,
    response::ApiResponse,
    state::AppState,
};

/// Whether `month` (1-12) falls inside the product's harvest window.
/// Windows may wrap around the new year; products without one are always in season.
pub fn in_season(product: &ProductModel, month: u32) -> bool {
    let month = month as i32;
    match (product.season_start_month, product.season_end_month) {
        (Some(start), Some(end)) if start <= end => (start..=end).contains(&month),
        (Some(start), Some(end)) => month >= start || month <= end,
        _ => true,
    }
}

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let month = Utc::now().month();
    let items: Vec<Product> = Products::find()
        .filter(ProdCol::Active.eq(true))
        .order_by_asc(ProdCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|model| Product::from_entity(model, month))
        .collect();

    let total = items.len() as i64;
    Ok(ApiResponse::paged("OK", ProductList { items }, 1, total, total))
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id.to_string())
        .one(&state.orm)
        .await?
        .filter(|p| p.active)
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::item(
        "OK",
        Product::from_entity(product, Utc::now().month()),
    ))
}

/// Active products keyed by id, restricted to `ids`.
pub async fn load_catalog<C: ConnectionTrait>(
    db: &C,
    ids: Vec<String>,
) -> AppResult<HashMap<String, ProductModel>> {
    Ok(Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .filter(ProdCol::Active.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|product| (product.id.clone(), product))
        .collect())
}

pub async fn active_catalog<C: ConnectionTrait>(db: &C) -> AppResult<Vec<ProductModel>> {
    Ok(Products::find()
        .filter(ProdCol::Active.eq(true))
        .order_by_asc(ProdCol::Name)
        .all(db)
        .await?)
}

//! Storefront catalog: listing, detail and categories.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::db::catalog::{ProductFilter, ProductSort, ProductSummary};
use crate::domain::aggregates::product::discounted_price;
use crate::domain::aggregates::{Category, Product, ProductImage, ProductVariant};
use crate::domain::value_objects::{Money, Percent};
use crate::error::{AppError, Result};
use crate::middleware::MaybeUser;
use crate::state::AppState;
use crate::{ListParams, PaginatedResponse};

pub const PRODUCTS_PER_PAGE: u32 = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
        .route("/categories", get(list_categories))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub in_stock: Option<bool>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
}

/// Fills offer fields on a page of summaries.
pub(crate) async fn with_offers(state: &AppState, mut rows: Vec<ProductSummary>) -> Result<Vec<ProductSummary>> {
    let ids: Vec<Uuid> = rows.iter().map(|p| p.id).collect();
    let offers = db::offers::best_offers(&state.db, &ids, Utc::now().date_naive()).await?;
    for row in &mut rows {
        row.best_offer = offers.get(&row.id).copied().unwrap_or_default();
        row.discounted_min_price = row.min_price.map(|p| discounted_price(p, row.best_offer));
    }
    Ok(rows)
}

async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> Result<Json<PaginatedResponse<ProductSummary>>> {
    let params = ListParams { page: q.page };
    let (limit, offset) = params.window(PRODUCTS_PER_PAGE);
    let filter = ProductFilter {
        active_only: true,
        category: q.category,
        min_price: q.min_price,
        max_price: q.max_price,
        in_stock: q.in_stock,
        q: q.q,
        sort: q.sort,
    };
    let mut conn = s.db.acquire().await?;
    let (rows, total) = db::catalog::list_products(&mut conn, &filter, limit, offset).await?;
    drop(conn);
    let rows = with_offers(&s, rows).await?;
    Ok(Json(PaginatedResponse::new(rows, total, &params, PRODUCTS_PER_PAGE)))
}

#[derive(Debug, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: ProductVariant,
    pub discounted_price: Money,
    pub in_stock: bool,
    /// Most units one cart line may hold.
    pub max_quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub best_offer: Percent,
    pub variants: Vec<VariantView>,
    pub images: Vec<ProductImage>,
    pub in_wishlist: bool,
}

async fn get_product(State(s): State<AppState>, MaybeUser(user): MaybeUser, Path(id): Path<Uuid>) -> Result<Json<ProductDetail>> {
    let product = db::catalog::find_product(&s.db, id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("Product"))?;
    let category = match product.category_id {
        Some(cid) => db::catalog::find_category(&s.db, cid).await?,
        None => None,
    };
    let best_offer = db::offers::best_offers(&s.db, &[product.id], Utc::now().date_naive())
        .await?
        .remove(&product.id)
        .unwrap_or_default();
    let variants = db::catalog::variants_for(&s.db, product.id)
        .await?
        .into_iter()
        .map(|v| VariantView { discounted_price: discounted_price(v.price, best_offer), in_stock: v.in_stock(), max_quantity: v.purchase_cap(), variant: v })
        .collect();
    let images = db::catalog::images_for(&s.db, product.id).await?;
    let in_wishlist = match &user {
        Some(u) => db::wishlist::contains(&s.db, u.id, product.id).await?,
        None => false,
    };
    Ok(Json(ProductDetail { product, category, best_offer, variants, images, in_wishlist }))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(db::catalog::list_categories(&s.db).await?))
}

//! Categories, products, variants and images.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::db::catalog::{ProductFilter, ProductInput, ProductSort, ProductSummary, VariantInput};
use crate::domain::aggregates::product::{validate_category_parent, validate_product, validate_variant};
use crate::domain::aggregates::{Category, Product, ProductImage, ProductVariant};
use crate::domain::value_objects::Money;
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::routes::products::with_offers;
use crate::state::AppState;
use crate::{ListParams, PaginatedResponse};

const ADMIN_PRODUCTS_PER_PAGE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product).put(update_product))
        .route("/products/:id/toggle", post(toggle_product))
        .route("/products/:id/variants", post(create_variant))
        .route("/variants/:id", put(update_variant).delete(delete_variant))
        .route("/products/:id/images", post(add_image))
        .route("/products/:id/images/:image_id", delete(remove_image))
}

// =============================================================================
// Categories
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<Uuid>,
}

async fn list_categories(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<Category>>> {
    Ok(Json(db::catalog::list_categories(&s.db).await?))
}

async fn check_parent(s: &AppState, id: Option<Uuid>, parent_id: Option<Uuid>) -> Result<()> {
    if let Some(parent_id) = parent_id {
        let parent = db::catalog::find_category(&s.db, parent_id).await?.ok_or_else(|| AppError::not_found("Parent category"))?;
        validate_category_parent(id, &parent)?;
    }
    Ok(())
}

async fn create_category(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Json(r): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    if r.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    check_parent(&s, None, r.parent_id).await?;
    let category = db::catalog::create_category(&s.db, &r.name, &r.description, r.parent_id).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn update_category(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(r): Json<CategoryRequest>,
) -> Result<Json<Category>> {
    if r.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name is required".into()));
    }
    check_parent(&s, Some(id), r.parent_id).await?;
    db::catalog::update_category(&s.db, id, &r.name, &r.description, r.parent_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Category"))
}

async fn delete_category(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if db::catalog::category_in_use(&s.db, id).await? {
        return Err(AppError::Conflict("Category still has products".into()));
    }
    if !db::catalog::delete_category(&s.db, id).await? {
        return Err(AppError::not_found("Category"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AdminProductQuery {
    pub category: Option<Uuid>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
}

/// Includes inactive products.
async fn list_products(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<AdminProductQuery>,
) -> Result<Json<PaginatedResponse<ProductSummary>>> {
    let params = ListParams { page: q.page };
    let (limit, offset) = params.window(ADMIN_PRODUCTS_PER_PAGE);
    let filter = ProductFilter { category: q.category, q: q.q, sort: q.sort, ..Default::default() };
    let mut conn = s.db.acquire().await?;
    let (rows, total) = db::catalog::list_products(&mut conn, &filter, limit, offset).await?;
    drop(conn);
    let rows = with_offers(&s, rows).await?;
    Ok(Json(PaginatedResponse::new(rows, total, &params, ADMIN_PRODUCTS_PER_PAGE)))
}

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub name: String,
    pub description: String,
    pub category_id: Option<Uuid>,
    pub brand: String,
    pub image_url: Option<String>,
}

impl ProductRequest {
    async fn checked(&self, s: &AppState) -> Result<ProductInput<'_>> {
        validate_product(&self.name, &self.brand, &self.description, self.category_id)?;
        if let Some(cid) = self.category_id {
            db::catalog::find_category(&s.db, cid).await?.ok_or_else(|| AppError::not_found("Category"))?;
        }
        Ok(ProductInput {
            name: &self.name,
            description: &self.description,
            category_id: self.category_id,
            brand: &self.brand,
            image_url: self.image_url.as_deref().filter(|u| !u.trim().is_empty()),
        })
    }
}

async fn create_product(
    State(s): State<AppState>,
    StaffUser(staff): StaffUser,
    Json(r): Json<ProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = db::catalog::create_product(&s.db, r.checked(&s).await?).await?;
    info!(product_id = %product.id, staff_id = %staff.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Serialize)]
pub struct AdminProduct {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
}

async fn get_product(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<Json<AdminProduct>> {
    let product = db::catalog::find_product(&s.db, id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    let variants = db::catalog::variants_for(&s.db, id).await?;
    let images = db::catalog::images_for(&s.db, id).await?;
    Ok(Json(AdminProduct { product, variants, images }))
}

async fn update_product(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(r): Json<ProductRequest>,
) -> Result<Json<Product>> {
    db::catalog::update_product(&s.db, id, r.checked(&s).await?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product"))
}

async fn toggle_product(State(s): State<AppState>, StaffUser(staff): StaffUser, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    let product = db::catalog::toggle_product_active(&s.db, id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    info!(product_id = %product.id, active = product.is_active, staff_id = %staff.id, "Product visibility changed");
    Ok(Json(product))
}

// =============================================================================
// Variants
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    pub color: String,
    pub size: String,
    pub price: Decimal,
    pub stock: i32,
}

impl VariantRequest {
    fn checked(&self) -> Result<VariantInput<'_>> {
        validate_variant(&self.color, &self.size, self.price, self.stock)?;
        Ok(VariantInput { color: &self.color, size: &self.size, price: Money::new(self.price), stock: self.stock })
    }
}

/// `(color, size)` is unique per product; a duplicate is a 409 via the unique index.
async fn create_variant(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<VariantRequest>,
) -> Result<(StatusCode, Json<ProductVariant>)> {
    let input = r.checked()?;
    db::catalog::find_product(&s.db, product_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    Ok((StatusCode::CREATED, Json(db::catalog::create_variant(&s.db, product_id, input).await?)))
}

async fn update_variant(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(r): Json<VariantRequest>,
) -> Result<Json<ProductVariant>> {
    db::catalog::update_variant(&s.db, id, r.checked()?)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Variant"))
}

async fn delete_variant(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !db::catalog::delete_variant(&s.db, id).await? {
        return Err(AppError::not_found("Variant"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Images
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub url: String,
    #[serde(default)]
    pub position: i32,
}

async fn add_image(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(product_id): Path<Uuid>,
    Json(r): Json<ImageRequest>,
) -> Result<(StatusCode, Json<ProductImage>)> {
    if url::Url::parse(r.url.trim()).is_err() {
        return Err(AppError::BadRequest("Image URL is invalid".into()));
    }
    db::catalog::find_product(&s.db, product_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    Ok((StatusCode::CREATED, Json(db::catalog::add_image(&s.db, product_id, r.url.trim(), r.position).await?)))
}

async fn remove_image(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path((product_id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    if !db::catalog::remove_image(&s.db, product_id, image_id).await? {
        return Err(AppError::not_found("Image"));
    }
    Ok(StatusCode::NO_CONTENT)
}

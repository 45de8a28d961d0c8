//! Categories, products, variants and images.

use sqlx::{PgConnection, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::domain::aggregates::{Category, Product, ProductImage, ProductVariant};
use crate::domain::value_objects::{Money, Percent};

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name").fetch_all(ex).await
}

pub async fn find_category(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1").bind(id).fetch_optional(ex).await
}

pub async fn create_category(ex: impl PgExecutor<'_>, name: &str, description: &str, parent_id: Option<Uuid>) -> sqlx::Result<Category> {
    sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, description, parent_id) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(name.trim())
        .bind(description.trim())
        .bind(parent_id)
        .fetch_one(ex)
        .await
}

pub async fn update_category(
    ex: impl PgExecutor<'_>,
    id: Uuid,
    name: &str,
    description: &str,
    parent_id: Option<Uuid>,
) -> sqlx::Result<Option<Category>> {
    sqlx::query_as::<_, Category>("UPDATE categories SET name = $2, description = $3, parent_id = $4 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(name.trim())
        .bind(description.trim())
        .bind(parent_id)
        .fetch_optional(ex)
        .await
}

pub async fn category_in_use(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE category_id = $1)").bind(id).fetch_one(ex).await
}

pub async fn delete_category(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(ex).await?.rows_affected() == 1)
}

// =============================================================================
// Products
// =============================================================================

/// A product row with its price range and stock, for listings.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub is_active: bool,
    pub min_price: Option<Money>,
    pub total_stock: i64,
    #[sqlx(skip)]
    pub best_offer: Percent,
    #[sqlx(skip)]
    pub discounted_min_price: Option<Money>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Name,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub active_only: bool,
    pub category: Option<Uuid>,
    pub min_price: Option<rust_decimal::Decimal>,
    pub max_price: Option<rust_decimal::Decimal>,
    pub in_stock: Option<bool>,
    pub q: Option<String>,
    pub sort: ProductSort,
}

const SUMMARY_FROM: &str = "FROM (SELECT p.id, p.name, p.brand, p.image_url, p.category_id, c.name AS category_name, \
     p.is_active, p.description, p.created_at, MIN(v.price) AS min_price, COALESCE(SUM(v.stock), 0)::BIGINT AS total_stock \
     FROM products p LEFT JOIN categories c ON c.id = p.category_id LEFT JOIN product_variants v ON v.product_id = p.id \
     GROUP BY p.id, c.name) s WHERE TRUE";

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, f: &ProductFilter) {
    if f.active_only {
        qb.push(" AND s.is_active");
    }
    if let Some(category) = f.category {
        qb.push(" AND s.category_id = ").push_bind(category);
    }
    if let Some(min) = f.min_price {
        qb.push(" AND s.min_price >= ").push_bind(min);
    }
    if let Some(max) = f.max_price {
        qb.push(" AND s.min_price <= ").push_bind(max);
    }
    match f.in_stock {
        Some(true) => { qb.push(" AND s.total_stock > 0"); }
        Some(false) => { qb.push(" AND s.total_stock = 0"); }
        None => {}
    }
    if let Some(q) = f.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{q}%");
        qb.push(" AND (s.name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR s.description ILIKE ").push_bind(pattern.clone());
        qb.push(" OR s.category_name ILIKE ").push_bind(pattern);
        qb.push(")");
    }
}

pub async fn list_products(conn: &mut PgConnection, f: &ProductFilter, limit: i64, offset: i64) -> sqlx::Result<(Vec<ProductSummary>, i64)> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) ");
    count.push(SUMMARY_FROM);
    push_filter(&mut count, f);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *conn).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT s.id, s.name, s.brand, s.image_url, s.category_id, s.category_name, s.is_active, s.min_price, s.total_stock ");
    qb.push(SUMMARY_FROM);
    push_filter(&mut qb, f);
    qb.push(match f.sort {
        ProductSort::Newest => " ORDER BY s.created_at DESC",
        ProductSort::Name => " ORDER BY LOWER(s.name) ASC",
        ProductSort::PriceAsc => " ORDER BY s.min_price ASC NULLS LAST",
        ProductSort::PriceDesc => " ORDER BY s.min_price DESC NULLS LAST",
    });
    qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    let rows = qb.build_query_as::<ProductSummary>().fetch_all(&mut *conn).await?;
    Ok((rows, total))
}

pub async fn find_product(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(ex).await
}

pub struct ProductInput<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category_id: Option<Uuid>,
    pub brand: &'a str,
    pub image_url: Option<&'a str>,
}

pub async fn create_product(ex: impl PgExecutor<'_>, p: ProductInput<'_>) -> sqlx::Result<Product> {
    sqlx::query_as::<_, Product>(
        "INSERT INTO products (id, name, description, category_id, brand, image_url) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(p.name.trim())
    .bind(p.description.trim())
    .bind(p.category_id)
    .bind(p.brand.trim())
    .bind(p.image_url)
    .fetch_one(ex)
    .await
}

pub async fn update_product(ex: impl PgExecutor<'_>, id: Uuid, p: ProductInput<'_>) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        "UPDATE products SET name = $2, description = $3, category_id = $4, brand = $5, image_url = $6, updated_at = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(p.name.trim())
    .bind(p.description.trim())
    .bind(p.category_id)
    .bind(p.brand.trim())
    .bind(p.image_url)
    .fetch_optional(ex)
    .await
}

pub async fn toggle_product_active(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Product>> {
    sqlx::query_as::<_, Product>("UPDATE products SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_optional(ex)
        .await
}

// =============================================================================
// Variants
// =============================================================================

pub async fn variants_for(ex: impl PgExecutor<'_>, product_id: Uuid) -> sqlx::Result<Vec<ProductVariant>> {
    sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE product_id = $1 ORDER BY color, size")
        .bind(product_id)
        .fetch_all(ex)
        .await
}

pub async fn find_variant(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<ProductVariant>> {
    sqlx::query_as::<_, ProductVariant>("SELECT * FROM product_variants WHERE id = $1").bind(id).fetch_optional(ex).await
}

pub struct VariantInput<'a> {
    pub color: &'a str,
    pub size: &'a str,
    pub price: Money,
    pub stock: i32,
}

pub async fn create_variant(ex: impl PgExecutor<'_>, product_id: Uuid, v: VariantInput<'_>) -> sqlx::Result<ProductVariant> {
    sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, color, size, price, stock) VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(product_id)
    .bind(v.color.trim())
    .bind(v.size.trim())
    .bind(v.price)
    .bind(v.stock)
    .fetch_one(ex)
    .await
}

pub async fn update_variant(ex: impl PgExecutor<'_>, id: Uuid, v: VariantInput<'_>) -> sqlx::Result<Option<ProductVariant>> {
    sqlx::query_as::<_, ProductVariant>(
        "UPDATE product_variants SET color = $2, size = $3, price = $4, stock = $5 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(v.color.trim())
    .bind(v.size.trim())
    .bind(v.price)
    .bind(v.stock)
    .fetch_optional(ex)
    .await
}

pub async fn delete_variant(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM product_variants WHERE id = $1").bind(id).execute(ex).await?.rows_affected() == 1)
}

/// A variant row locked for checkout, with its product's state.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LockedVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub stock: i32,
    pub product_active: bool,
}

pub async fn lock_variants(conn: &mut PgConnection, ids: &[Uuid]) -> sqlx::Result<Vec<LockedVariant>> {
    sqlx::query_as::<_, LockedVariant>(
        "SELECT v.id, v.product_id, v.stock, p.is_active AS product_active FROM product_variants v \
         JOIN products p ON p.id = v.product_id WHERE v.id = ANY($1) ORDER BY v.id FOR UPDATE OF v",
    )
    .bind(ids)
    .fetch_all(conn)
    .await
}

pub async fn adjust_stock(ex: impl PgExecutor<'_>, variant_id: Uuid, delta: i32) -> sqlx::Result<()> {
    sqlx::query("UPDATE product_variants SET stock = stock + $2 WHERE id = $1").bind(variant_id).bind(delta).execute(ex).await?;
    Ok(())
}

// =============================================================================
// Images
// =============================================================================

pub async fn images_for(ex: impl PgExecutor<'_>, product_id: Uuid) -> sqlx::Result<Vec<ProductImage>> {
    sqlx::query_as::<_, ProductImage>("SELECT * FROM product_images WHERE product_id = $1 ORDER BY position, created_at")
        .bind(product_id)
        .fetch_all(ex)
        .await
}

pub async fn add_image(ex: impl PgExecutor<'_>, product_id: Uuid, url: &str, position: i32) -> sqlx::Result<ProductImage> {
    sqlx::query_as::<_, ProductImage>("INSERT INTO product_images (id, product_id, url, position) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(Uuid::now_v7())
        .bind(product_id)
        .bind(url)
        .bind(position)
        .fetch_one(ex)
        .await
}

pub async fn remove_image(ex: impl PgExecutor<'_>, product_id: Uuid, image_id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM product_images WHERE id = $1 AND product_id = $2")
        .bind(image_id)
        .bind(product_id)
        .execute(ex)
        .await?
        .rows_affected()
        == 1)
}

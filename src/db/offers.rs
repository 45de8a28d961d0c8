//! Product and category offers, and best-offer lookup.

use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::offer::{best_offer, OfferWindow};
use crate::domain::aggregates::{CategoryOffer, ProductOffer};
use crate::domain::value_objects::Percent;

#[derive(sqlx::FromRow)]
struct OfferRow {
    product_id: Uuid,
    discount_percent: Percent,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    active: bool,
}

/// Best live offer for each product, from its own and its category's offers.
/// Products without a live offer map to zero.
pub async fn best_offers(ex: impl PgExecutor<'_>, product_ids: &[Uuid], today: NaiveDate) -> sqlx::Result<HashMap<Uuid, Percent>> {
    let rows = sqlx::query_as::<_, OfferRow>(
        "SELECT o.product_id, o.discount_percent, o.start_date, o.end_date, o.active \
         FROM product_offers o WHERE o.product_id = ANY($1) \
         UNION ALL \
         SELECT p.id, c.discount_percent, c.start_date, c.end_date, c.active \
         FROM category_offers c JOIN products p ON p.category_id = c.category_id WHERE p.id = ANY($1)",
    )
    .bind(product_ids)
    .fetch_all(ex)
    .await?;

    let mut windows: HashMap<Uuid, Vec<OfferWindow>> = HashMap::new();
    for row in rows {
        windows.entry(row.product_id).or_default().push(OfferWindow {
            discount_percent: row.discount_percent,
            start_date: row.start_date,
            end_date: row.end_date,
            active: row.active,
        });
    }
    Ok(product_ids
        .iter()
        .map(|id| (*id, best_offer(windows.remove(id).unwrap_or_default(), today)))
        .collect())
}

pub struct OfferInput {
    pub target_id: Uuid,
    pub discount_percent: Percent,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

pub async fn list_product_offers(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<ProductOffer>> {
    sqlx::query_as::<_, ProductOffer>("SELECT * FROM product_offers ORDER BY created_at DESC").fetch_all(ex).await
}

pub async fn create_product_offer(ex: impl PgExecutor<'_>, o: &OfferInput) -> sqlx::Result<ProductOffer> {
    sqlx::query_as::<_, ProductOffer>(
        "INSERT INTO product_offers (id, product_id, discount_percent, start_date, end_date, active) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(o.target_id)
    .bind(o.discount_percent)
    .bind(o.start_date)
    .bind(o.end_date)
    .bind(o.active)
    .fetch_one(ex)
    .await
}

pub async fn update_product_offer(ex: impl PgExecutor<'_>, id: Uuid, o: &OfferInput) -> sqlx::Result<Option<ProductOffer>> {
    sqlx::query_as::<_, ProductOffer>(
        "UPDATE product_offers SET product_id = $2, discount_percent = $3, start_date = $4, end_date = $5, active = $6 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(o.target_id)
    .bind(o.discount_percent)
    .bind(o.start_date)
    .bind(o.end_date)
    .bind(o.active)
    .fetch_optional(ex)
    .await
}

pub async fn delete_product_offer(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM product_offers WHERE id = $1").bind(id).execute(ex).await?.rows_affected() == 1)
}

pub async fn list_category_offers(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<CategoryOffer>> {
    sqlx::query_as::<_, CategoryOffer>("SELECT * FROM category_offers ORDER BY created_at DESC").fetch_all(ex).await
}

pub async fn create_category_offer(ex: impl PgExecutor<'_>, o: &OfferInput) -> sqlx::Result<CategoryOffer> {
    sqlx::query_as::<_, CategoryOffer>(
        "INSERT INTO category_offers (id, category_id, discount_percent, start_date, end_date, active) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(o.target_id)
    .bind(o.discount_percent)
    .bind(o.start_date)
    .bind(o.end_date)
    .bind(o.active)
    .fetch_one(ex)
    .await
}

pub async fn update_category_offer(ex: impl PgExecutor<'_>, id: Uuid, o: &OfferInput) -> sqlx::Result<Option<CategoryOffer>> {
    sqlx::query_as::<_, CategoryOffer>(
        "UPDATE category_offers SET category_id = $2, discount_percent = $3, start_date = $4, end_date = $5, active = $6 \
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(o.target_id)
    .bind(o.discount_percent)
    .bind(o.start_date)
    .bind(o.end_date)
    .bind(o.active)
    .fetch_optional(ex)
    .await
}

pub async fn delete_category_offer(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM category_offers WHERE id = $1").bind(id).execute(ex).await?.rows_affected() == 1)
}

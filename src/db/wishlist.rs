//! Wishlist.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub brand: String,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn list(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<WishlistEntry>> {
    sqlx::query_as::<_, WishlistEntry>(
        "SELECT w.id, w.product_id, p.name, p.brand, p.image_url, p.is_active, w.created_at \
         FROM wishlist_items w JOIN products p ON p.id = w.product_id WHERE w.user_id = $1 ORDER BY w.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await
}

/// Idempotent.
pub async fn add(ex: impl PgExecutor<'_>, user_id: Uuid, product_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO wishlist_items (id, user_id, product_id) VALUES ($1, $2, $3) ON CONFLICT (user_id, product_id) DO NOTHING")
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(product_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn remove(ex: impl PgExecutor<'_>, user_id: Uuid, product_id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
        .bind(user_id)
        .bind(product_id)
        .execute(ex)
        .await?
        .rows_affected()
        == 1)
}

pub async fn contains(ex: impl PgExecutor<'_>, user_id: Uuid, product_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM wishlist_items WHERE user_id = $1 AND product_id = $2)")
        .bind(user_id)
        .bind(product_id)
        .fetch_one(ex)
        .await
}

//! Cart rows and the applied coupon.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, Coupon};

const LINE_SELECT: &str = "SELECT ci.id AS item_id, ci.variant_id, p.id AS product_id, p.category_id, p.name AS product_name, \
     p.brand, p.image_url, v.color, v.size, v.price, v.stock, ci.quantity, p.is_active AS product_active \
     FROM cart_items ci JOIN product_variants v ON v.id = ci.variant_id JOIN products p ON p.id = v.product_id";

pub async fn lines(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>(&format!("{LINE_SELECT} WHERE ci.user_id = $1 ORDER BY ci.added_at"))
        .bind(user_id)
        .fetch_all(ex)
        .await
}

pub async fn line(ex: impl PgExecutor<'_>, user_id: Uuid, item_id: Uuid) -> sqlx::Result<Option<CartLine>> {
    sqlx::query_as::<_, CartLine>(&format!("{LINE_SELECT} WHERE ci.user_id = $1 AND ci.id = $2"))
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(ex)
        .await
}

pub async fn quantity_of(ex: impl PgExecutor<'_>, user_id: Uuid, variant_id: Uuid) -> sqlx::Result<Option<i32>> {
    sqlx::query_scalar("SELECT quantity FROM cart_items WHERE user_id = $1 AND variant_id = $2")
        .bind(user_id)
        .bind(variant_id)
        .fetch_optional(ex)
        .await
}

pub async fn upsert(ex: impl PgExecutor<'_>, user_id: Uuid, variant_id: Uuid, quantity: i32) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO cart_items (id, user_id, variant_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (user_id, variant_id) DO UPDATE SET quantity = EXCLUDED.quantity",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(variant_id)
    .bind(quantity)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn set_quantity(ex: impl PgExecutor<'_>, item_id: Uuid, quantity: i32) -> sqlx::Result<()> {
    sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1").bind(item_id).bind(quantity).execute(ex).await?;
    Ok(())
}

pub async fn remove(ex: impl PgExecutor<'_>, user_id: Uuid, item_id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .execute(ex)
        .await?
        .rows_affected()
        == 1)
}

pub async fn remove_many(ex: impl PgExecutor<'_>, item_ids: &[Uuid]) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)").bind(item_ids).execute(ex).await?;
    Ok(())
}

pub async fn clear(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1").bind(user_id).execute(ex).await?;
    Ok(())
}

pub async fn applied_coupon(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT c.* FROM cart_coupons cc JOIN coupons c ON c.id = cc.coupon_id WHERE cc.user_id = $1")
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn attach_coupon(ex: impl PgExecutor<'_>, user_id: Uuid, coupon_id: Uuid) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO cart_coupons (user_id, coupon_id) VALUES ($1, $2) \
         ON CONFLICT (user_id) DO UPDATE SET coupon_id = EXCLUDED.coupon_id, applied_at = NOW()",
    )
    .bind(user_id)
    .bind(coupon_id)
    .execute(ex)
    .await?;
    Ok(())
}

pub async fn detach_coupon(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM cart_coupons WHERE user_id = $1").bind(user_id).execute(ex).await?;
    Ok(())
}

//! Coupons and redemptions.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::coupon::ValidCoupon;
use crate::domain::aggregates::Coupon;
use crate::domain::value_objects::Money;

pub async fn find(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1").bind(id).fetch_optional(ex).await
}

/// Locks the coupon row for the rest of the transaction.
pub async fn find_for_update(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(ex).await
}

/// Case-insensitive lookup among active coupons.
pub async fn find_active_by_code(ex: impl PgExecutor<'_>, code: &str) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE LOWER(code) = LOWER($1) AND active")
        .bind(code)
        .fetch_optional(ex)
        .await
}

pub async fn code_taken(ex: impl PgExecutor<'_>, code: &str, except: Option<Uuid>) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupons WHERE LOWER(code) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))")
        .bind(code)
        .bind(except)
        .fetch_one(ex)
        .await
}

pub async fn list(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<Coupon>> {
    sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY valid_from DESC").fetch_all(ex).await
}

pub async fn create(ex: impl PgExecutor<'_>, c: &ValidCoupon) -> sqlx::Result<Coupon> {
    sqlx::query_as::<_, Coupon>(
        "INSERT INTO coupons (id, code, kind, discount, min_purchase, usage_limit, valid_from, valid_to, active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(&c.code)
    .bind(c.kind)
    .bind(c.discount)
    .bind(c.min_purchase)
    .bind(c.usage_limit)
    .bind(c.valid_from)
    .bind(c.valid_to)
    .bind(c.active)
    .fetch_one(ex)
    .await
}

pub async fn update(ex: impl PgExecutor<'_>, id: Uuid, c: &ValidCoupon) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>(
        "UPDATE coupons SET code = $2, kind = $3, discount = $4, min_purchase = $5, usage_limit = $6, valid_from = $7, \
         valid_to = $8, active = $9 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&c.code)
    .bind(c.kind)
    .bind(c.discount)
    .bind(c.min_purchase)
    .bind(c.usage_limit)
    .bind(c.valid_from)
    .bind(c.valid_to)
    .bind(c.active)
    .fetch_optional(ex)
    .await
}

pub async fn delete(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<bool> {
    Ok(sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(ex).await?.rows_affected() == 1)
}

/// Whether the user holds a redemption of this coupon that was not refunded.
pub async fn redeemed_by(ex: impl PgExecutor<'_>, coupon_id: Uuid, user_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupon_redemptions WHERE coupon_id = $1 AND user_id = $2 AND NOT refunded)")
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(ex)
        .await
}

pub async fn insert_redemption(ex: impl PgExecutor<'_>, coupon_id: Uuid, user_id: Uuid, order_id: Uuid, amount: Money) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO coupon_redemptions (id, coupon_id, user_id, order_id, discount_amount) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(Uuid::now_v7())
    .bind(coupon_id)
    .bind(user_id)
    .bind(order_id)
    .bind(amount)
    .execute(ex)
    .await?;
    Ok(())
}

/// Counts one use. False when the usage limit is already reached.
pub async fn increment_used(ex: impl PgExecutor<'_>, coupon_id: Uuid) -> sqlx::Result<bool> {
    let done = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1 WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(coupon_id)
    .execute(ex)
    .await?;
    Ok(done.rows_affected() == 1)
}

/// Lets the user use the coupon again after the order was fully refunded.
pub async fn release_for_order(ex: impl PgExecutor<'_>, order_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE coupon_redemptions SET refunded = TRUE WHERE order_id = $1").bind(order_id).execute(ex).await?;
    Ok(())
}

//! Orders and order items.

use sqlx::types::Json;
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::domain::aggregates::order::ShippingAddress;
use crate::domain::aggregates::{Order, OrderAggregate, OrderItem, OrderItemStatus, PaymentMethod, PaymentStatus};
use crate::domain::pricing::OrderPricing;
use crate::domain::value_objects::Money;

pub struct NewOrder<'a> {
    pub order_code: &'a str,
    pub user_id: Uuid,
    pub shipping_address: &'a ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub pricing: &'a OrderPricing,
    pub coupon_id: Option<Uuid>,
}

pub async fn insert_order(ex: impl PgExecutor<'_>, o: NewOrder<'_>) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(
        "INSERT INTO orders (id, order_code, user_id, shipping_address, payment_method, payment_status, subtotal, tax, \
         delivery_charge, discount, grand_total, coupon_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(o.order_code)
    .bind(o.user_id)
    .bind(Json(o.shipping_address))
    .bind(o.payment_method)
    .bind(o.payment_status)
    .bind(o.pricing.subtotal)
    .bind(o.pricing.tax)
    .bind(o.pricing.delivery_charge)
    .bind(o.pricing.discount)
    .bind(o.pricing.grand_total)
    .bind(o.coupon_id)
    .fetch_one(ex)
    .await
}

pub struct NewOrderItem<'a> {
    pub order_id: Uuid,
    pub variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: &'a str,
    pub color: &'a str,
    pub size: &'a str,
    pub quantity: i32,
    pub unit_price: Money,
    pub tax: Money,
    pub discount: Money,
}

pub async fn insert_item(ex: impl PgExecutor<'_>, i: NewOrderItem<'_>) -> sqlx::Result<OrderItem> {
    sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (id, order_id, variant_id, product_id, product_name, color, size, quantity, unit_price, tax, discount) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(i.order_id)
    .bind(i.variant_id)
    .bind(i.product_id)
    .bind(i.product_name)
    .bind(i.color)
    .bind(i.size)
    .bind(i.quantity)
    .bind(i.unit_price)
    .bind(i.tax)
    .bind(i.discount)
    .fetch_one(ex)
    .await
}

pub async fn items(ex: impl PgExecutor<'_>, order_id: Uuid) -> sqlx::Result<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(ex).await
}

pub async fn items_for_orders(ex: impl PgExecutor<'_>, order_ids: &[Uuid]) -> sqlx::Result<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id").bind(order_ids).fetch_all(ex).await
}

pub async fn find(ex: impl PgExecutor<'_>, id: Uuid) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(ex).await
}

pub async fn find_by_code(ex: impl PgExecutor<'_>, user_id: Uuid, order_code: &str) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_code = $1 AND user_id = $2")
        .bind(order_code)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

/// Loads an order with its items, locking the order row.
/// `user_id` restricts the lookup to the owner when given.
pub async fn load_for_update(conn: &mut PgConnection, order_id: Uuid, user_id: Option<Uuid>) -> sqlx::Result<Option<OrderAggregate>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND ($2::uuid IS NULL OR user_id = $2) FOR UPDATE")
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(order) = order else { return Ok(None) };
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id FOR UPDATE")
        .bind(order.id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(Some(OrderAggregate::new(order, items)))
}

/// Order id owning an item, for item-addressed admin actions.
pub async fn order_of_item(ex: impl PgExecutor<'_>, item_id: Uuid) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar("SELECT order_id FROM order_items WHERE id = $1").bind(item_id).fetch_optional(ex).await
}

pub async fn list_for_user(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC").bind(user_id).fetch_all(ex).await
}

const ADMIN_FILTER: &str =
    "($1::order_item_status IS NULL OR EXISTS (SELECT 1 FROM order_items i WHERE i.order_id = o.id AND i.status = $1))";

pub async fn admin_list(ex: impl PgExecutor<'_>, status: Option<OrderItemStatus>, limit: i64, offset: i64) -> sqlx::Result<Vec<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT o.* FROM orders o WHERE {ADMIN_FILTER} ORDER BY o.created_at DESC LIMIT $2 OFFSET $3"))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(ex)
        .await
}

pub async fn admin_count(ex: impl PgExecutor<'_>, status: Option<OrderItemStatus>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders o WHERE {ADMIN_FILTER}")).bind(status).fetch_one(ex).await
}

/// An item awaiting an admin decision, with its order reference.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PendingRequest {
    pub item_id: Uuid,
    pub order_id: Uuid,
    pub order_code: String,
    pub customer_email: String,
    pub product_name: String,
    pub quantity: i32,
    pub status: OrderItemStatus,
    pub reason: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub async fn pending_cancellations(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<PendingRequest>> {
    sqlx::query_as::<_, PendingRequest>(
        "SELECT i.id AS item_id, o.id AS order_id, o.order_code, u.email AS customer_email, i.product_name, i.quantity, i.status, \
         i.cancellation_reason AS reason, i.updated_at FROM order_items i JOIN orders o ON o.id = i.order_id \
         JOIN users u ON u.id = o.user_id WHERE i.cancellation_requested AND i.cancellation_approved IS NULL ORDER BY i.updated_at",
    )
    .fetch_all(ex)
    .await
}

pub async fn pending_returns(ex: impl PgExecutor<'_>) -> sqlx::Result<Vec<PendingRequest>> {
    sqlx::query_as::<_, PendingRequest>(
        "SELECT i.id AS item_id, o.id AS order_id, o.order_code, u.email AS customer_email, i.product_name, i.quantity, i.status, \
         i.return_reason AS reason, i.updated_at FROM order_items i JOIN orders o ON o.id = i.order_id \
         JOIN users u ON u.id = o.user_id WHERE i.return_requested AND i.return_approved IS NULL ORDER BY i.updated_at",
    )
    .fetch_all(ex)
    .await
}

/// Writes back the mutable state of an order and all its items.
pub async fn save(conn: &mut PgConnection, agg: &OrderAggregate) -> sqlx::Result<()> {
    let o = agg.order();
    sqlx::query(
        "UPDATE orders SET payment_status = $2, razorpay_order_id = $3, razorpay_payment_id = $4, razorpay_signature = $5, \
         delivery_refunded = $6, cod_settled = $7, updated_at = $8 WHERE id = $1",
    )
    .bind(o.id)
    .bind(o.payment_status)
    .bind(&o.razorpay_order_id)
    .bind(&o.razorpay_payment_id)
    .bind(&o.razorpay_signature)
    .bind(o.delivery_refunded)
    .bind(o.cod_settled)
    .bind(o.updated_at)
    .execute(&mut *conn)
    .await?;
    for i in agg.items() {
        sqlx::query(
            "UPDATE order_items SET status = $2, cancellation_requested = $3, cancellation_reason = $4, cancellation_approved = $5, \
             return_requested = $6, return_reason = $7, return_approved = $8, refund_amount = $9, delivered_at = $10, updated_at = $11 \
             WHERE id = $1",
        )
        .bind(i.id)
        .bind(i.status)
        .bind(i.cancellation_requested)
        .bind(&i.cancellation_reason)
        .bind(i.cancellation_approved)
        .bind(i.return_requested)
        .bind(&i.return_reason)
        .bind(i.return_approved)
        .bind(i.refund_amount)
        .bind(i.delivered_at)
        .bind(i.updated_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn set_razorpay_order(ex: impl PgExecutor<'_>, order_id: Uuid, razorpay_order_id: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE orders SET razorpay_order_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(order_id)
        .bind(razorpay_order_id)
        .execute(ex)
        .await?;
    Ok(())
}

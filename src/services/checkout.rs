//! Cart, applied coupon and order placement.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db;
use crate::db::orders::{NewOrder, NewOrderItem};
use crate::domain::aggregates::cart::{quantity_after_add, quantity_after_change, OFFER_COUPON_NOTICE};
use crate::domain::aggregates::coupon::normalize_code;
use crate::domain::aggregates::{
    Cart, CartError, CartLine, Coupon, CouponError, OrderAggregate, PaymentMethod, PaymentStatus, QuantityChange, User,
};
use crate::domain::events::DomainEvent;
use crate::domain::pricing::{OrderPricing, PricingPolicy};
use crate::domain::value_objects::{Money, OrderCode};
use crate::error::{AppError, Result};
use crate::services::wallet;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub line: CartLine,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Money,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub item_count: usize,
    pub has_offer: bool,
    /// Quantities were clamped or sold-out lines dropped.
    pub adjusted: bool,
    pub coupon: Option<AppliedCoupon>,
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub notices: Vec<String>,
}

/// Loads the user's cart with each line's best live offer.
async fn load_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Cart> {
    let mut lines = db::cart::lines(&mut *conn, user_id).await?;
    let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let offers = db::offers::best_offers(&mut *conn, &product_ids, Utc::now().date_naive()).await?;
    for line in &mut lines {
        line.best_offer = offers.get(&line.product_id).copied().unwrap_or_default();
    }
    Ok(Cart::new(user_id, lines))
}

/// The applied coupon if it still holds for this cart; otherwise it is
/// detached and the reason returned. With `lock` the coupon row stays locked
/// until the caller's transaction ends, so usage counts are checked against
/// the latest committed redemptions.
async fn usable_coupon(conn: &mut PgConnection, cart: &Cart, lock: bool) -> Result<(Option<Coupon>, Option<String>)> {
    let Some(mut coupon) = db::cart::applied_coupon(&mut *conn, cart.user_id()).await? else {
        return Ok((None, None));
    };
    if lock {
        match db::coupons::find_for_update(&mut *conn, coupon.id).await? {
            Some(fresh) => coupon = fresh,
            None => return Ok((None, None)),
        }
    }
    let verdict = if cart.has_offer() {
        Err(OFFER_COUPON_NOTICE.to_string())
    } else {
        let redeemed = db::coupons::redeemed_by(&mut *conn, coupon.id, cart.user_id()).await?;
        coupon.check_eligible(Utc::now(), cart.subtotal(), redeemed).map_err(|e| e.to_string())
    };
    match verdict {
        Ok(()) => Ok((Some(coupon), None)),
        Err(notice) => {
            db::cart::detach_coupon(&mut *conn, cart.user_id()).await?;
            Ok((None, Some(notice)))
        }
    }
}

#[instrument(skip(db))]
pub async fn view_cart(db: &PgPool, user_id: Uuid) -> Result<CartView> {
    let mut tx = db.begin().await?;
    let mut cart = load_cart(&mut tx, user_id).await?;
    let adjustments = cart.reconcile();
    if !adjustments.removed.is_empty() {
        db::cart::remove_many(&mut *tx, &adjustments.removed).await?;
    }
    for (item_id, qty) in &adjustments.clamped {
        db::cart::set_quantity(&mut *tx, *item_id, i32::try_from(*qty).unwrap_or(i32::MAX)).await?;
    }

    let (coupon, notice) = usable_coupon(&mut tx, &cart, false).await?;
    tx.commit().await?;

    let subtotal = cart.subtotal();
    let coupon = coupon.map(|c| AppliedCoupon { discount: c.discount_for(subtotal), code: c.code });
    let discount = coupon.as_ref().map_or_else(Money::zero, |c| c.discount);
    Ok(CartView {
        item_count: cart.item_count(),
        has_offer: cart.has_offer(),
        adjusted: !adjustments.is_empty(),
        items: cart
            .into_lines()
            .into_iter()
            .map(|line| CartLineView { unit_price: line.unit_price(), line_total: line.line_total(), line })
            .collect(),
        coupon,
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
        notices: notice.into_iter().collect(),
    })
}

/// Adds one unit of a variant. Returns the line's new quantity.
#[instrument(skip(db))]
pub async fn add_item(db: &PgPool, user_id: Uuid, variant_id: Uuid) -> Result<u32> {
    let mut tx = db.begin().await?;
    let variant = db::catalog::find_variant(&mut *tx, variant_id).await?.ok_or_else(|| AppError::not_found("Product variant"))?;
    let product = db::catalog::find_product(&mut *tx, variant.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("Product"))?;
    let current = db::cart::quantity_of(&mut *tx, user_id, variant_id).await?;
    let qty = quantity_after_add(current.map(|q| u32::try_from(q).unwrap_or(0)), variant.stock, product.is_active)?;
    db::cart::upsert(&mut *tx, user_id, variant_id, i32::try_from(qty).unwrap_or(i32::MAX)).await?;
    db::wishlist::remove(&mut *tx, user_id, product.id).await?;
    tx.commit().await?;
    Ok(qty)
}

/// Returns the new quantity, or `None` when the line was removed.
#[instrument(skip(db))]
pub async fn change_quantity(db: &PgPool, user_id: Uuid, item_id: Uuid, change: QuantityChange) -> Result<Option<u32>> {
    let line = db::cart::line(db, user_id, item_id).await?.ok_or_else(|| AppError::not_found("Cart item"))?;
    let next = quantity_after_change(line.quantity(), line.stock, change)?;
    match next {
        Some(qty) => db::cart::set_quantity(db, item_id, i32::try_from(qty).unwrap_or(i32::MAX)).await?,
        None => {
            db::cart::remove(db, user_id, item_id).await?;
        }
    }
    Ok(next)
}

pub async fn remove_item(db: &PgPool, user_id: Uuid, item_id: Uuid) -> Result<()> {
    if !db::cart::remove(db, user_id, item_id).await? {
        return Err(AppError::not_found("Cart item"));
    }
    Ok(())
}

#[instrument(skip(db))]
pub async fn apply_coupon(db: &PgPool, user_id: Uuid, code: &str) -> Result<CartView> {
    let code = normalize_code(code)?;
    let mut tx = db.begin().await?;
    let coupon = db::coupons::find_active_by_code(&mut *tx, &code).await?.ok_or(CouponError::NotFound)?;
    let cart = load_cart(&mut tx, user_id).await?;
    if cart.is_empty() {
        return Err(CouponError::EmptyCart.into());
    }
    if cart.has_offer() {
        return Err(CouponError::CartHasOffers.into());
    }
    let redeemed = db::coupons::redeemed_by(&mut *tx, coupon.id, user_id).await?;
    coupon.check_eligible(Utc::now(), cart.subtotal(), redeemed)?;
    db::cart::attach_coupon(&mut *tx, user_id, coupon.id).await?;
    tx.commit().await?;
    info!(coupon = %coupon.code, "Coupon applied");
    view_cart(db, user_id).await
}

pub async fn remove_coupon(db: &PgPool, user_id: Uuid) -> Result<()> {
    db::cart::detach_coupon(db, user_id).await?;
    Ok(())
}

/// Checkout figures for the current cart, without placing anything.
pub async fn preview(db: &PgPool, policy: &PricingPolicy, user_id: Uuid) -> Result<OrderPricing> {
    let mut conn = db.acquire().await?;
    let cart = load_cart(&mut conn, user_id).await?;
    let (coupon, _) = usable_coupon(&mut conn, &cart, false).await?;
    let discount = coupon.map_or_else(Money::zero, |c| c.discount_for(cart.subtotal()));
    Ok(policy.price(&priced_lines(&cart), discount))
}

fn priced_lines(cart: &Cart) -> Vec<(Money, u32)> { cart.lines().iter().map(|l| (l.unit_price(), l.quantity())).collect() }

#[derive(Debug, Deserialize)]
pub struct PlaceOrder {
    pub address_id: Uuid,
    pub payment_method: PaymentMethod,
}

/// Places the user's cart as an order in one transaction.
#[instrument(skip(state, user, req), fields(user_id = %user.id, method = ?req.payment_method), err(Display))]
pub async fn place_order(state: &AppState, user: &User, req: PlaceOrder) -> Result<OrderAggregate> {
    if req.payment_method == PaymentMethod::Razorpay && state.razorpay.is_none() {
        return Err(AppError::BadRequest("Online payment is not available".into()));
    }

    let mut tx = state.db.begin().await?;
    let address = db::addresses::find(&mut *tx, user.id, req.address_id).await?.ok_or_else(|| AppError::not_found("Address"))?;
    let cart = load_cart(&mut tx, user.id).await?;
    if cart.is_empty() {
        return Err(CartError::Empty.into());
    }

    let variant_ids: Vec<Uuid> = cart.lines().iter().map(|l| l.variant_id).collect();
    let locked = db::catalog::lock_variants(&mut tx, &variant_ids).await?;
    for line in cart.lines() {
        let available = locked.iter().find(|v| v.id == line.variant_id).filter(|v| v.product_active).map_or(0, |v| v.stock);
        if available < line.quantity {
            return Err(AppError::Conflict(format!("Insufficient stock for {} ({} / {})", line.product_name, line.color, line.size)));
        }
    }

    let (coupon, _) = usable_coupon(&mut tx, &cart, true).await?;
    let discount = coupon.as_ref().map_or_else(Money::zero, |c| c.discount_for(cart.subtotal()));
    let pricing = state.pricing().price(&priced_lines(&cart), discount);

    let payment_status = if req.payment_method == PaymentMethod::Wallet { PaymentStatus::Paid } else { PaymentStatus::Pending };
    let code = OrderCode::generate();
    let order = db::orders::insert_order(
        &mut *tx,
        NewOrder {
            order_code: code.as_str(),
            user_id: user.id,
            shipping_address: &address.snapshot(),
            payment_method: req.payment_method,
            payment_status,
            pricing: &pricing,
            coupon_id: coupon.as_ref().map(|c| c.id),
        },
    )
    .await?;

    let mut items = Vec::with_capacity(cart.item_count());
    for (line, priced) in cart.lines().iter().zip(&pricing.lines) {
        items.push(
            db::orders::insert_item(
                &mut *tx,
                NewOrderItem {
                    order_id: order.id,
                    variant_id: line.variant_id,
                    product_id: line.product_id,
                    product_name: &line.product_name,
                    color: &line.color,
                    size: &line.size,
                    quantity: line.quantity,
                    unit_price: priced.unit_price,
                    tax: priced.tax,
                    discount: priced.discount,
                },
            )
            .await?,
        );
        db::catalog::adjust_stock(&mut *tx, line.variant_id, -line.quantity).await?;
    }

    if req.payment_method == PaymentMethod::Wallet {
        wallet::pay(&mut tx, user.id, pricing.grand_total, &format!("Payment for order {}", order.order_code), order.id).await?;
    }
    if let Some(coupon) = &coupon {
        db::coupons::insert_redemption(&mut *tx, coupon.id, user.id, order.id, pricing.discount).await?;
        if !db::coupons::increment_used(&mut *tx, coupon.id).await? {
            return Err(CouponError::UsageLimitReached.into());
        }
    }
    db::cart::clear(&mut *tx, user.id).await?;
    db::cart::detach_coupon(&mut *tx, user.id).await?;
    tx.commit().await?;

    info!(order_code = %order.order_code, grand_total = %order.grand_total, "Order placed");
    let mut events = vec![DomainEvent::OrderPlaced {
        order_id: order.id,
        order_code: order.order_code.clone(),
        user_id: user.id,
        grand_total: order.grand_total,
        payment_method: order.payment_method,
    }];
    if order.payment_status == PaymentStatus::Paid {
        events.push(DomainEvent::OrderPaid {
            order_id: order.id,
            order_code: order.order_code.clone(),
            amount: order.grand_total,
            payment_method: order.payment_method,
        });
    }
    state.publish(events).await;
    Ok(OrderAggregate::new(order, items))
}

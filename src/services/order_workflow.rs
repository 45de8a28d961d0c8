//! Order item lifecycle and online payment, persisted.
//!
//! Every operation loads the order under a row lock, applies the change on
//! [`OrderAggregate`], writes its side effects (stock, wallet, ledgers) in the
//! same transaction, and publishes the collected events after commit.

use chrono::Utc;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::order::{Decision, Resolution};
use crate::domain::aggregates::{OrderAggregate, OrderItemStatus, PaymentStatus, TransactionKind, TransactionStatus, User};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Money, CURRENCY};
use crate::error::{AppError, Result};
use crate::services::mailer::order_confirmation_body;
use crate::services::wallet;
use crate::state::AppState;

async fn load(conn: &mut PgConnection, order_id: Uuid, owner: Option<Uuid>) -> Result<OrderAggregate> {
    db::orders::load_for_update(conn, order_id, owner).await?.ok_or_else(|| AppError::not_found("Order"))
}

async fn load_by_item(conn: &mut PgConnection, item_id: Uuid, owner: Option<Uuid>) -> Result<OrderAggregate> {
    let order_id = db::orders::order_of_item(&mut *conn, item_id).await?.ok_or_else(|| AppError::not_found("Order item"))?;
    load(conn, order_id, owner).await
}

/// Admin status move for one item.
#[instrument(skip(state), err(Display))]
pub async fn advance_item(state: &AppState, item_id: Uuid, to: OrderItemStatus) -> Result<OrderAggregate> {
    let mut tx = state.db.begin().await?;
    let mut agg = load_by_item(&mut tx, item_id, None).await?;
    if let Some(amount) = agg.advance_item(item_id, to, Utc::now())? {
        record_cod_collection(&mut tx, &agg, amount).await?;
    }
    db::orders::save(&mut tx, &agg).await?;
    tx.commit().await?;
    state.publish(agg.take_events()).await;
    Ok(agg)
}

#[instrument(skip(state, user, reason), fields(user_id = %user.id), err(Display))]
pub async fn request_cancellation(state: &AppState, user: &User, item_id: Uuid, reason: &str) -> Result<OrderAggregate> {
    let mut tx = state.db.begin().await?;
    let mut agg = load_by_item(&mut tx, item_id, Some(user.id)).await?;
    agg.request_cancellation(item_id, reason, Utc::now())?;
    db::orders::save(&mut tx, &agg).await?;
    tx.commit().await?;
    Ok(agg)
}

#[instrument(skip(state, user, reason), fields(user_id = %user.id), err(Display))]
pub async fn request_return(state: &AppState, user: &User, item_id: Uuid, reason: &str) -> Result<OrderAggregate> {
    let mut tx = state.db.begin().await?;
    let mut agg = load_by_item(&mut tx, item_id, Some(user.id)).await?;
    agg.request_return(item_id, reason, Utc::now())?;
    db::orders::save(&mut tx, &agg).await?;
    tx.commit().await?;
    Ok(agg)
}

#[derive(Debug, Clone, Copy)]
pub enum RequestKind {
    Cancellation,
    Return,
}

/// Admin approval or rejection of a pending cancellation or return.
#[instrument(skip(state), err(Display))]
pub async fn decide(state: &AppState, kind: RequestKind, item_id: Uuid, decision: Decision) -> Result<OrderAggregate> {
    let mut tx = state.db.begin().await?;
    let mut agg = load_by_item(&mut tx, item_id, None).await?;
    let now = Utc::now();
    let resolution = match kind {
        RequestKind::Cancellation => agg.decide_cancellation(item_id, decision, now)?,
        RequestKind::Return => agg.decide_return(item_id, decision, now)?,
    };
    let mut events = settle(&mut tx, &agg, resolution).await?;
    db::orders::save(&mut tx, &agg).await?;
    tx.commit().await?;

    let mut all = agg.take_events();
    all.append(&mut events);
    state.publish(all).await;
    Ok(agg)
}

async fn record_cod_collection(conn: &mut PgConnection, agg: &OrderAggregate, amount: Money) -> Result<()> {
    let order = agg.order();
    wallet::record_receipt(
        conn,
        order.user_id,
        TransactionKind::Cod,
        TransactionStatus::Credit,
        amount,
        format!("Cash collected for order {}", order.order_code),
        order.id,
    )
    .await?;
    info!(order_code = %order.order_code, %amount, "COD order settled");
    Ok(())
}

/// Writes the stock and money side effects of an approved request.
async fn settle(conn: &mut PgConnection, agg: &OrderAggregate, resolution: Resolution) -> Result<Vec<DomainEvent>> {
    let order = agg.order();
    let mut events = Vec::new();
    if let Some((variant_id, qty)) = resolution.restock {
        db::catalog::adjust_stock(&mut *conn, variant_id, i32::try_from(qty).unwrap_or(0)).await?;
    }
    if let Some(refund) = resolution.refund {
        let description = format!("Refund for order {}", order.order_code);
        events.push(wallet::refund(&mut *conn, order.user_id, refund.total(), &description, Some(order.id)).await?);
        info!(order_code = %order.order_code, item_id = %refund.item_id, amount = %refund.total(), "Refund issued");
    }
    if let Some(amount) = resolution.collected {
        record_cod_collection(&mut *conn, agg, amount).await?;
    }
    if resolution.release_coupon {
        db::coupons::release_for_order(&mut *conn, order.id).await?;
    }
    Ok(events)
}

/// What the client needs to open the Razorpay checkout.
#[derive(Debug, Serialize)]
pub struct PaymentSession {
    pub key_id: String,
    pub razorpay_order_id: String,
    pub amount_paise: i64,
    pub currency: &'static str,
    pub order_code: String,
}

#[instrument(skip(state, user), fields(user_id = %user.id), err(Display))]
pub async fn start_payment(state: &AppState, user: &User, order_id: Uuid) -> Result<PaymentSession> {
    let client = state.razorpay.as_ref().ok_or_else(|| AppError::BadRequest("Online payment is not available".into()))?;
    let order = {
        let mut tx = state.db.begin().await?;
        let agg = load(&mut tx, order_id, Some(user.id)).await?;
        agg.ensure_payment_open()?;
        let (order, _) = agg.into_parts();
        tx.commit().await?;
        order
    };

    let gateway = client.create_order(order.grand_total, &order.order_code).await?;
    db::orders::set_razorpay_order(&state.db, order.id, &gateway.id).await?;
    info!(order_code = %order.order_code, razorpay_order_id = %gateway.id, "Payment started");
    Ok(PaymentSession {
        key_id: client.key_id().to_string(),
        razorpay_order_id: gateway.id,
        amount_paise: order.grand_total.to_paise(),
        currency: CURRENCY,
        order_code: order.order_code,
    })
}

#[derive(Debug, serde::Deserialize)]
pub struct PaymentProof {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Checks the gateway signature. A mismatch marks the payment failed and
/// is reported as a bad request after the failure is recorded.
#[instrument(skip(state, user, proof), fields(user_id = %user.id), err(Display))]
pub async fn verify_payment(state: &AppState, user: &User, order_id: Uuid, proof: PaymentProof) -> Result<OrderAggregate> {
    let client = state.razorpay.as_ref().ok_or_else(|| AppError::BadRequest("Online payment is not available".into()))?;
    let mut tx = state.db.begin().await?;
    let mut agg = load(&mut tx, order_id, Some(user.id)).await?;
    agg.ensure_payment_open()?;

    let order_matches = agg.order().razorpay_order_id.as_deref() == Some(proof.razorpay_order_id.as_str());
    let verified = order_matches && client.verify(&proof.razorpay_order_id, &proof.razorpay_payment_id, &proof.razorpay_signature);
    let now = Utc::now();
    let status = if verified {
        agg.record_gateway_payment(&proof.razorpay_payment_id, &proof.razorpay_signature);
        agg.mark_paid(now);
        TransactionStatus::Credit
    } else {
        agg.mark_payment_failed(now);
        TransactionStatus::Failed
    };
    let order = agg.order();
    wallet::record_receipt(
        &mut tx,
        order.user_id,
        TransactionKind::OnlinePayment,
        status,
        order.grand_total,
        format!("Online payment for order {}", order.order_code),
        order.id,
    )
    .await?;
    db::orders::save(&mut tx, &agg).await?;
    tx.commit().await?;
    state.publish(agg.take_events()).await;

    let order = agg.order();
    if !verified {
        warn!(order_code = %order.order_code, "Payment signature mismatch");
        return Err(AppError::BadRequest("Payment verification failed".into()));
    }
    info!(order_code = %order.order_code, amount = %order.grand_total, "Online payment verified");
    let body = order_confirmation_body(&user.full_name, &order.order_code, &order.grand_total.to_string());
    if let Err(e) = state.mailer.send(&user.email, "Your GearUp order is confirmed", &body).await {
        warn!(error = %e, order_code = %order.order_code, "Confirmation email failed");
    }
    Ok(agg)
}

/// The client gave up on or failed the payment.
#[instrument(skip(state, user), fields(user_id = %user.id), err(Display))]
pub async fn fail_payment(state: &AppState, user: &User, order_id: Uuid) -> Result<OrderAggregate> {
    let mut tx = state.db.begin().await?;
    let mut agg = load(&mut tx, order_id, Some(user.id)).await?;
    agg.ensure_payment_open()?;
    if agg.order().payment_status == PaymentStatus::Pending {
        agg.mark_payment_failed(Utc::now());
        db::orders::save(&mut tx, &agg).await?;
    }
    tx.commit().await?;
    state.publish(agg.take_events()).await;
    Ok(agg)
}

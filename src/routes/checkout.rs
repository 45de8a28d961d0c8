use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::db;
use crate::domain::aggregates::{Address, Order, OrderItem, PaymentMethod};
use crate::domain::pricing::OrderPricing;
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::checkout::{self, PlaceOrder};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/checkout", get(preview).post(place_order))
}

#[derive(Debug, Serialize)]
pub struct CheckoutPreview {
    pub pricing: OrderPricing,
    pub addresses: Vec<Address>,
    pub wallet_balance: Money,
}

async fn preview(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<CheckoutPreview>> {
    let pricing = checkout::preview(&s.db, &s.pricing(), user.id).await?;
    let addresses = db::addresses::list(&s.db, user.id).await?;
    let wallet_balance = db::wallet::find(&s.db, user.id).await?.map_or_else(Money::zero, |w| w.balance);
    Ok(Json(CheckoutPreview { pricing, addresses, wallet_balance }))
}

#[derive(Debug, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// True when the client must continue with `/payments/:order_id/start`.
    pub payment_required: bool,
}

async fn place_order(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(r): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let agg = checkout::place_order(&s, &user, r).await?;
    let (order, items) = agg.into_parts();
    let payment_required = order.payment_method == PaymentMethod::Razorpay;
    Ok((StatusCode::CREATED, Json(PlacedOrder { order, items, payment_required })))
}

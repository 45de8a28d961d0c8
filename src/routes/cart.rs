use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::aggregates::QuantityChange;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::checkout::{self, CartView};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(view_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", patch(change_quantity).delete(remove_item))
        .route("/cart/coupon", post(apply_coupon).delete(remove_coupon))
}

async fn view_cart(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<CartView>> {
    Ok(Json(checkout::view_cart(&s.db, user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub variant_id: Uuid,
}

async fn add_item(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(r): Json<AddItem>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let quantity = checkout::add_item(&s.db, user.id, r.variant_id).await?;
    Ok((StatusCode::CREATED, Json(json!({ "variant_id": r.variant_id, "quantity": quantity }))))
}

#[derive(Debug, Deserialize)]
pub struct ChangeQuantity {
    pub action: QuantityChange,
}

/// Decreasing past one removes the line.
async fn change_quantity(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(r): Json<ChangeQuantity>,
) -> Result<Json<CartView>> {
    checkout::change_quantity(&s.db, user.id, id, r.action).await?;
    Ok(Json(checkout::view_cart(&s.db, user.id).await?))
}

async fn remove_item(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    checkout::remove_item(&s.db, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ApplyCoupon {
    pub code: String,
}

async fn apply_coupon(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<ApplyCoupon>) -> Result<Json<CartView>> {
    Ok(Json(checkout::apply_coupon(&s.db, user.id, &r.code).await?))
}

async fn remove_coupon(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<CartView>> {
    checkout::remove_coupon(&s.db, user.id).await?;
    Ok(Json(checkout::view_cart(&s.db, user.id).await?))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::db::wishlist::WishlistEntry;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wishlist", get(list_wishlist).post(add_to_wishlist))
        .route("/wishlist/:product_id", delete(remove_from_wishlist))
}

async fn list_wishlist(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<WishlistEntry>>> {
    Ok(Json(db::wishlist::list(&s.db, user.id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AddToWishlist {
    pub product_id: Uuid,
}

async fn add_to_wishlist(State(s): State<AppState>, CurrentUser(user): CurrentUser, Json(r): Json<AddToWishlist>) -> Result<StatusCode> {
    db::catalog::find_product(&s.db, r.product_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    db::wishlist::add(&s.db, user.id, r.product_id).await?;
    Ok(StatusCode::CREATED)
}

async fn remove_from_wishlist(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(product_id): Path<Uuid>) -> Result<StatusCode> {
    if !db::wishlist::remove(&s.db, user.id, product_id).await? {
        return Err(AppError::not_found("Wishlist item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

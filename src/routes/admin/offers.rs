//! Product and category offers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::db;
use crate::db::offers::OfferInput;
use crate::domain::aggregates::offer::validate_offer;
use crate::domain::aggregates::{CategoryOffer, ProductOffer};
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/offers/products", get(list_product_offers).post(create_product_offer))
        .route("/offers/products/:id", put(update_product_offer).delete(delete_product_offer))
        .route("/offers/categories", get(list_category_offers).post(create_category_offer))
        .route("/offers/categories/:id", put(update_category_offer).delete(delete_category_offer))
}

#[derive(Debug, Deserialize)]
pub struct OfferRequest {
    /// Product or category, depending on the route.
    pub target_id: Uuid,
    pub discount_percent: Decimal,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

impl TryFrom<OfferRequest> for OfferInput {
    type Error = AppError;

    fn try_from(r: OfferRequest) -> Result<Self> {
        let discount_percent = validate_offer(r.discount_percent, r.start_date, r.end_date)?;
        Ok(OfferInput { target_id: r.target_id, discount_percent, start_date: r.start_date, end_date: r.end_date, active: r.active })
    }
}

async fn list_product_offers(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<ProductOffer>>> {
    Ok(Json(db::offers::list_product_offers(&s.db).await?))
}

async fn create_product_offer(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Json(r): Json<OfferRequest>,
) -> Result<(StatusCode, Json<ProductOffer>)> {
    let input = OfferInput::try_from(r)?;
    db::catalog::find_product(&s.db, input.target_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    Ok((StatusCode::CREATED, Json(db::offers::create_product_offer(&s.db, &input).await?)))
}

async fn update_product_offer(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(r): Json<OfferRequest>,
) -> Result<Json<ProductOffer>> {
    let input = OfferInput::try_from(r)?;
    db::catalog::find_product(&s.db, input.target_id).await?.ok_or_else(|| AppError::not_found("Product"))?;
    db::offers::update_product_offer(&s.db, id, &input).await?.map(Json).ok_or_else(|| AppError::not_found("Offer"))
}

async fn delete_product_offer(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !db::offers::delete_product_offer(&s.db, id).await? {
        return Err(AppError::not_found("Offer"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_category_offers(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<CategoryOffer>>> {
    Ok(Json(db::offers::list_category_offers(&s.db).await?))
}

async fn create_category_offer(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Json(r): Json<OfferRequest>,
) -> Result<(StatusCode, Json<CategoryOffer>)> {
    let input = OfferInput::try_from(r)?;
    db::catalog::find_category(&s.db, input.target_id).await?.ok_or_else(|| AppError::not_found("Category"))?;
    Ok((StatusCode::CREATED, Json(db::offers::create_category_offer(&s.db, &input).await?)))
}

async fn update_category_offer(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(r): Json<OfferRequest>,
) -> Result<Json<CategoryOffer>> {
    let input = OfferInput::try_from(r)?;
    db::catalog::find_category(&s.db, input.target_id).await?.ok_or_else(|| AppError::not_found("Category"))?;
    db::offers::update_category_offer(&s.db, id, &input).await?.map(Json).ok_or_else(|| AppError::not_found("Offer"))
}

async fn delete_category_offer(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !db::offers::delete_category_offer(&s.db, id).await? {
        return Err(AppError::not_found("Offer"));
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::coupon::CouponDraft;
use crate::domain::aggregates::Coupon;
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/:id", put(update_coupon).delete(delete_coupon))
}

async fn list_coupons(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(db::coupons::list(&s.db).await?))
}

async fn create_coupon(State(s): State<AppState>, StaffUser(_): StaffUser, Json(draft): Json<CouponDraft>) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = draft.validate()?;
    if db::coupons::code_taken(&s.db, &coupon.code, None).await? {
        return Err(AppError::Conflict("A coupon with this code already exists".into()));
    }
    Ok((StatusCode::CREATED, Json(db::coupons::create(&s.db, &coupon).await?)))
}

async fn update_coupon(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(id): Path<Uuid>,
    Json(draft): Json<CouponDraft>,
) -> Result<Json<Coupon>> {
    let coupon = draft.validate()?;
    if db::coupons::code_taken(&s.db, &coupon.code, Some(id)).await? {
        return Err(AppError::Conflict("A coupon with this code already exists".into()));
    }
    db::coupons::update(&s.db, id, &coupon).await?.map(Json).ok_or_else(|| AppError::not_found("Coupon"))
}

async fn delete_coupon(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !db::coupons::delete(&s.db, id).await? {
        return Err(AppError::not_found("Coupon"));
    }
    Ok(StatusCode::NO_CONTENT)
}

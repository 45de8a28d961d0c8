use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;

use crate::db;
use crate::domain::aggregates::Coupon;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/coupons", get(available_coupons))
}

/// Coupons a customer could apply right now.
async fn available_coupons(State(s): State<AppState>, CurrentUser(_user): CurrentUser) -> Result<Json<Vec<Coupon>>> {
    let now = Utc::now();
    let coupons = db::coupons::list(&s.db).await?.into_iter().filter(|c| c.check_valid(now).is_ok()).collect();
    Ok(Json(coupons))
}

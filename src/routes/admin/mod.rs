//! Staff back office. Every handler takes a `StaffUser`.

use axum::Router;

use crate::state::AppState;

pub mod catalog;
pub mod coupons;
pub mod dashboard;
pub mod offers;
pub mod orders;
pub mod transactions;
pub mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(catalog::router())
        .merge(offers::router())
        .merge(coupons::router())
        .merge(orders::router())
        .merge(transactions::router())
        .merge(users::router())
        .merge(dashboard::router())
}

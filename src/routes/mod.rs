//! HTTP routes, mounted under `/api/v1`.

use axum::Router;

use crate::state::AppState;

pub mod account;
pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod orders;
pub mod payments;
pub mod products;
pub mod wallet;
pub mod wishlist;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .merge(cart::router())
        .merge(wishlist::router())
        .merge(coupons::router())
        .merge(checkout::router())
        .merge(orders::router())
        .merge(payments::router())
        .merge(wallet::router())
        .merge(account::router())
        .merge(addresses::router())
        .nest("/admin", admin::router())
}

//! Postgres persistence, one module per table group.

pub mod addresses;
pub mod cart;
pub mod catalog;
pub mod coupons;
pub mod offers;
pub mod orders;
pub mod otps;
pub mod reports;
pub mod sessions;
pub mod transactions;
pub mod users;
pub mod wallet;
pub mod wishlist;

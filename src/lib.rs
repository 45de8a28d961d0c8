//! GearUp storefront
//!
//! JSON API for an outdoor-gear shop backed by Postgres.
//!
//! ## Features
//! - Catalog with variants, product and category offers
//! - Cart, wishlist and coupons
//! - Checkout with COD, wallet or Razorpay payment
//! - Per-item order lifecycle with cancellation, returns and wallet refunds
//! - Staff back office with sales dashboard and CSV report

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

/// Builds the full router with its layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "gearup"})) }))
        .nest("/api/v1", routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// =============================================================================
// Pagination
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }

    /// `(limit, offset)` for a fixed page size.
    pub fn window(&self, per_page: u32) -> (i64, i64) {
        let per_page = i64::from(per_page);
        (per_page, (i64::from(self.page()) - 1) * per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, params: &ListParams, per_page: u32) -> Self {
        Self { data, total, page: params.page(), per_page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window() {
        assert_eq!(ListParams::default().window(8), (8, 0));
        assert_eq!(ListParams { page: Some(3) }.window(10), (10, 20));
        assert_eq!(ListParams { page: Some(0) }.window(25), (25, 0));
    }
}

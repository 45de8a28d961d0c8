//! Customer order history, tracking, cancel/return requests and invoice.

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::order::derived_status;
use crate::domain::aggregates::{Order, OrderAggregate, OrderItem, OrderItemStatus};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::services::{invoice, order_workflow};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:code", get(get_order))
        .route("/orders/:code/invoice", get(get_invoice))
        .route("/orders/:code/invoice.html", get(get_invoice_html))
        .route("/orders/track/:code", get(track_order))
        .route("/orders/items/:item_id/cancel", post(request_cancellation))
        .route("/orders/items/:item_id/return", post(request_return))
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub status: OrderItemStatus,
    pub items: Vec<OrderItem>,
}

impl From<OrderAggregate> for OrderView {
    fn from(agg: OrderAggregate) -> Self {
        let status = agg.status();
        let (order, items) = agg.into_parts();
        Self { order, status, items }
    }
}

/// Attaches items to each order, keeping the order of `orders`.
pub(crate) async fn with_items(s: &AppState, orders: Vec<Order>) -> Result<Vec<OrderView>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in db::orders::items_for_orders(&s.db, &ids).await? {
        by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderView::from(OrderAggregate::new(order, items))
        })
        .collect())
}

async fn list_orders(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<OrderView>>> {
    let orders = db::orders::list_for_user(&s.db, user.id).await?;
    Ok(Json(with_items(&s, orders).await?))
}

async fn owned_order(s: &AppState, user_id: Uuid, code: &str) -> Result<OrderAggregate> {
    let order = db::orders::find_by_code(&s.db, user_id, code).await?.ok_or_else(|| AppError::not_found("Order"))?;
    let items = db::orders::items(&s.db, order.id).await?;
    Ok(OrderAggregate::new(order, items))
}

async fn get_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(code): Path<String>) -> Result<Json<OrderView>> {
    Ok(Json(owned_order(&s, user.id, &code).await?.into()))
}

#[derive(Debug, Serialize)]
pub struct TrackedItem {
    pub item_id: Uuid,
    pub product_name: String,
    pub status: OrderItemStatus,
    pub label: &'static str,
    pub delivered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct Tracking {
    pub order_code: String,
    pub placed_at: DateTime<Utc>,
    pub status: OrderItemStatus,
    pub items: Vec<TrackedItem>,
}

async fn track_order(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(code): Path<String>) -> Result<Json<Tracking>> {
    let (order, items) = owned_order(&s, user.id, &code).await?.into_parts();
    Ok(Json(Tracking {
        order_code: order.order_code,
        placed_at: order.created_at,
        status: derived_status(&items),
        items: items
            .into_iter()
            .map(|i| TrackedItem { item_id: i.id, label: i.status.label(), status: i.status, delivered_at: i.delivered_at, product_name: i.product_name })
            .collect(),
    }))
}

async fn get_invoice(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(code): Path<String>) -> Result<impl IntoResponse> {
    let (order, items) = owned_order(&s, user.id, &code).await?.into_parts();
    let pdf = invoice::render_pdf(&order, &items)?;
    let disposition = format!("attachment; filename=\"{}\"", invoice::pdf_filename(&order));
    Ok(([(header::CONTENT_TYPE, "application/pdf".to_string()), (header::CONTENT_DISPOSITION, disposition)], pdf))
}

async fn get_invoice_html(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(code): Path<String>) -> Result<impl IntoResponse> {
    let (order, items) = owned_order(&s, user.id, &code).await?.into_parts();
    let html = invoice::render(&order, &items)?;
    let disposition = format!("inline; filename=\"{}\"", invoice::filename(&order));
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()), (header::CONTENT_DISPOSITION, disposition)], html))
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

async fn request_cancellation(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<ReasonRequest>,
) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::request_cancellation(&s, &user, item_id, &r.reason).await?.into()))
}

async fn request_return(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<ReasonRequest>,
) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::request_return(&s, &user, item_id, &r.reason).await?.into()))
}

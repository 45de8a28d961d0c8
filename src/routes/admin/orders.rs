//! Order list, detail, item status and the cancellation and return queues.

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::db::orders::PendingRequest;
use crate::domain::aggregates::order::Decision;
use crate::domain::aggregates::{OrderAggregate, OrderItemStatus, Profile};
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::routes::orders::{with_items, OrderView};
use crate::services::order_workflow::{self, RequestKind};
use crate::state::AppState;
use crate::{ListParams, PaginatedResponse};

const ORDERS_PER_PAGE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/items/:item_id/status", patch(update_item_status))
        .route("/cancellations", get(cancellation_queue))
        .route("/cancellations/:item_id", post(decide_cancellation))
        .route("/returns", get(return_queue))
        .route("/returns/:item_id", post(decide_return))
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderItemStatus>,
    pub page: Option<u32>,
}

async fn list_orders(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Query(q): Query<OrderListQuery>,
) -> Result<Json<PaginatedResponse<OrderView>>> {
    let params = ListParams { page: q.page };
    let (limit, offset) = params.window(ORDERS_PER_PAGE);
    let orders = db::orders::admin_list(&s.db, q.status, limit, offset).await?;
    let total = db::orders::admin_count(&s.db, q.status).await?;
    let views = with_items(&s, orders).await?;
    Ok(Json(PaginatedResponse::new(views, total, &params, ORDERS_PER_PAGE)))
}

#[derive(Debug, Serialize)]
pub struct AdminOrder {
    #[serde(flatten)]
    pub view: OrderView,
    pub customer: Option<Profile>,
}

async fn get_order(State(s): State<AppState>, StaffUser(_): StaffUser, Path(id): Path<Uuid>) -> Result<Json<AdminOrder>> {
    let order = db::orders::find(&s.db, id).await?.ok_or_else(|| AppError::not_found("Order"))?;
    let customer = db::users::find_by_id(&s.db, order.user_id).await?.as_ref().map(Profile::from);
    let items = db::orders::items(&s.db, order.id).await?;
    Ok(Json(AdminOrder { view: OrderAggregate::new(order, items).into(), customer }))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderItemStatus,
}

async fn update_item_status(
    State(s): State<AppState>,
    StaffUser(staff): StaffUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<StatusUpdate>,
) -> Result<Json<OrderView>> {
    let agg = order_workflow::advance_item(&s, item_id, r.status).await?;
    info!(%item_id, status = r.status.label(), staff_id = %staff.id, "Item status updated");
    Ok(Json(agg.into()))
}

async fn cancellation_queue(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<PendingRequest>>> {
    Ok(Json(db::orders::pending_cancellations(&s.db).await?))
}

async fn return_queue(State(s): State<AppState>, StaffUser(_): StaffUser) -> Result<Json<Vec<PendingRequest>>> {
    Ok(Json(db::orders::pending_returns(&s.db).await?))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

async fn decide_cancellation(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<DecisionRequest>,
) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::decide(&s, RequestKind::Cancellation, item_id, r.decision).await?.into()))
}

async fn decide_return(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Path(item_id): Path<Uuid>,
    Json(r): Json<DecisionRequest>,
) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::decide(&s, RequestKind::Return, item_id, r.decision).await?.into()))
}

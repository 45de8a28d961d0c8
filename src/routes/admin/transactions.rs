use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::db;
use crate::db::transactions::LedgerRow;
use crate::error::Result;
use crate::middleware::StaffUser;
use crate::state::AppState;
use crate::{ListParams, PaginatedResponse};

const TRANSACTIONS_PER_PAGE: u32 = 25;

pub fn router() -> Router<AppState> {
    Router::new().route("/transactions", get(list_transactions))
}

async fn list_transactions(
    State(s): State<AppState>,
    StaffUser(_): StaffUser,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<LedgerRow>>> {
    let (limit, offset) = p.window(TRANSACTIONS_PER_PAGE);
    let rows = db::transactions::list(&s.db, limit, offset).await?;
    let total = db::transactions::count(&s.db).await?;
    Ok(Json(PaginatedResponse::new(rows, total, &p, TRANSACTIONS_PER_PAGE)))
}

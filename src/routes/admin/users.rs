//! Customer list and blocking.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::User;
use crate::error::{AppError, Result};
use crate::middleware::StaffUser;
use crate::state::AppState;
use crate::{ListParams, PaginatedResponse};

const USERS_PER_PAGE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/block", post(block_user))
        .route("/users/:id/unblock", post(unblock_user))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
}

async fn list_users(State(s): State<AppState>, StaffUser(_): StaffUser, Query(q): Query<UserQuery>) -> Result<Json<PaginatedResponse<User>>> {
    let params = ListParams { page: q.page };
    let (limit, offset) = params.window(USERS_PER_PAGE);
    let search = q.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let users = db::users::list_customers(&s.db, search, limit, offset).await?;
    let total = db::users::count_customers(&s.db, search).await?;
    Ok(Json(PaginatedResponse::new(users, total, &params, USERS_PER_PAGE)))
}

/// Staff accounts cannot be blocked. Blocking ends every session of the user.
async fn block_user(State(s): State<AppState>, StaffUser(staff): StaffUser, Path(id): Path<Uuid>) -> Result<Json<User>> {
    let mut tx = s.db.begin().await?;
    let user = db::users::set_blocked(&mut *tx, id, true).await?.ok_or_else(|| AppError::not_found("User"))?;
    let ended = db::sessions::delete_for_user(&mut *tx, id).await?;
    tx.commit().await?;
    info!(user_id = %id, staff_id = %staff.id, sessions = ended, "User blocked");
    Ok(Json(user))
}

async fn unblock_user(State(s): State<AppState>, StaffUser(staff): StaffUser, Path(id): Path<Uuid>) -> Result<Json<User>> {
    let user = db::users::set_blocked(&s.db, id, false).await?.ok_or_else(|| AppError::not_found("User"))?;
    info!(user_id = %id, staff_id = %staff.id, "User unblocked");
    Ok(Json(user))
}

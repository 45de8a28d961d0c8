use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::db;
use crate::db::addresses::AddressInput;
use crate::domain::aggregates::Address;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/:id", put(update_address).delete(delete_address))
        .route("/addresses/:id/default", post(set_default))
}

async fn list_addresses(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<Vec<Address>>> {
    Ok(Json(db::addresses::list(&s.db, user.id).await?))
}

async fn create_address(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<AddressInput>,
) -> Result<(StatusCode, Json<Address>)> {
    input.validate()?;
    let mut tx = s.db.begin().await?;
    let address = db::addresses::insert(&mut tx, user.id, &input).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(address)))
}

async fn update_address(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AddressInput>,
) -> Result<Json<Address>> {
    input.validate()?;
    let mut tx = s.db.begin().await?;
    let address = db::addresses::update(&mut tx, user.id, id, &input).await?.ok_or_else(|| AppError::not_found("Address"))?;
    tx.commit().await?;
    Ok(Json(address))
}

async fn set_default(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let mut tx = s.db.begin().await?;
    if !db::addresses::set_default(&mut tx, user.id, id).await? {
        return Err(AppError::not_found("Address"));
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_address(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let mut tx = s.db.begin().await?;
    if !db::addresses::delete(&mut tx, user.id, id).await? {
        return Err(AppError::not_found("Address"));
    }
    tx.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

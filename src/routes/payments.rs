use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::routes::orders::OrderView;
use crate::services::order_workflow::{self, PaymentProof, PaymentSession};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payments/:order_id/start", post(start))
        .route("/payments/:order_id/verify", post(verify))
        .route("/payments/:order_id/fail", post(fail))
}

async fn start(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(order_id): Path<Uuid>) -> Result<Json<PaymentSession>> {
    Ok(Json(order_workflow::start_payment(&s, &user, order_id).await?))
}

async fn verify(
    State(s): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(proof): Json<PaymentProof>,
) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::verify_payment(&s, &user, order_id, proof).await?.into()))
}

async fn fail(State(s): State<AppState>, CurrentUser(user): CurrentUser, Path(order_id): Path<Uuid>) -> Result<Json<OrderView>> {
    Ok(Json(order_workflow::fail_payment(&s, &user, order_id).await?.into()))
}

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::db;
use crate::domain::aggregates::WalletTransaction;
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/wallet", get(get_wallet))
}

#[derive(Debug, Serialize)]
pub struct WalletView {
    pub balance: Money,
    pub transactions: Vec<WalletTransaction>,
}

/// A user without a wallet row sees a zero balance.
async fn get_wallet(State(s): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Json<WalletView>> {
    let balance = db::wallet::find(&s.db, user.id).await?.map_or_else(Money::zero, |w| w.balance);
    let transactions = db::wallet::entries(&s.db, user.id).await?;
    Ok(Json(WalletView { balance, transactions }))
}

//! Wallet balances and the wallet ledger.

use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

use crate::domain::aggregates::wallet::LedgerDirection;
use crate::domain::aggregates::{Wallet, WalletTransaction};
use crate::domain::value_objects::Money;

pub async fn find(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Option<Wallet>> {
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1").bind(user_id).fetch_optional(ex).await
}

/// Locks the user's wallet, creating an empty one first if missing.
pub async fn lock_or_create(conn: &mut PgConnection, user_id: Uuid) -> sqlx::Result<Wallet> {
    sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query_as::<_, Wallet>("SELECT * FROM wallets WHERE user_id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
}

pub async fn store_balance(ex: impl PgExecutor<'_>, wallet: &Wallet) -> sqlx::Result<()> {
    sqlx::query("UPDATE wallets SET balance = $2, updated_at = $3 WHERE user_id = $1")
        .bind(wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.updated_at)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn insert_entry(
    ex: impl PgExecutor<'_>,
    user_id: Uuid,
    direction: LedgerDirection,
    amount: Money,
    description: &str,
    order_id: Option<Uuid>,
) -> sqlx::Result<WalletTransaction> {
    sqlx::query_as::<_, WalletTransaction>(
        "INSERT INTO wallet_transactions (id, user_id, direction, amount, description, order_id) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(user_id)
    .bind(direction)
    .bind(amount)
    .bind(description)
    .bind(order_id)
    .fetch_one(ex)
    .await
}

pub async fn entries(ex: impl PgExecutor<'_>, user_id: Uuid) -> sqlx::Result<Vec<WalletTransaction>> {
    sqlx::query_as::<_, WalletTransaction>("SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(ex)
        .await
}

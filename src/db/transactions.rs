//! Admin money ledger.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::domain::aggregates::wallet::{generate_transaction_id, NewTransaction};
use crate::domain::aggregates::{Transaction, TransactionKind, TransactionStatus};
use crate::domain::value_objects::Money;

pub async fn insert(ex: impl PgExecutor<'_>, t: &NewTransaction) -> sqlx::Result<Transaction> {
    sqlx::query_as::<_, Transaction>(
        "INSERT INTO transactions (id, transaction_id, user_id, kind, status, amount, description, order_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(generate_transaction_id())
    .bind(t.user_id)
    .bind(t.kind)
    .bind(t.status)
    .bind(t.amount)
    .bind(&t.description)
    .bind(t.order_id)
    .fetch_one(ex)
    .await
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct LedgerRow {
    pub transaction_id: String,
    pub user_email: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Money,
    pub description: String,
    pub order_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list(ex: impl PgExecutor<'_>, limit: i64, offset: i64) -> sqlx::Result<Vec<LedgerRow>> {
    sqlx::query_as::<_, LedgerRow>(
        "SELECT t.transaction_id, u.email AS user_email, t.kind, t.status, t.amount, t.description, o.order_code, t.created_at \
         FROM transactions t JOIN users u ON u.id = t.user_id LEFT JOIN orders o ON o.id = t.order_id \
         ORDER BY t.created_at DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(ex)
    .await
}

pub async fn count(ex: impl PgExecutor<'_>) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions").fetch_one(ex).await
}

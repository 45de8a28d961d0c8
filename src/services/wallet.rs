//! Wallet movements. Each one updates the balance, the wallet ledger and the
//! admin transaction ledger together, inside the caller's transaction.

use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use crate::db;
use crate::domain::aggregates::wallet::{LedgerDirection, NewTransaction};
use crate::domain::aggregates::{TransactionKind, TransactionStatus};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Money;
use crate::error::Result;

/// Credits a refund. Returns the event to publish once committed.
pub async fn refund(conn: &mut PgConnection, user_id: Uuid, amount: Money, description: &str, order_id: Option<Uuid>) -> Result<DomainEvent> {
    let mut wallet = db::wallet::lock_or_create(&mut *conn, user_id).await?;
    let balance = wallet.credit(amount)?;
    db::wallet::store_balance(&mut *conn, &wallet).await?;
    db::wallet::insert_entry(&mut *conn, user_id, LedgerDirection::Credit, amount, description, order_id).await?;
    db::transactions::insert(
        &mut *conn,
        &NewTransaction {
            user_id,
            kind: TransactionKind::WalletCredit,
            status: TransactionStatus::Debit,
            amount,
            description: description.to_string(),
            order_id,
        },
    )
    .await?;
    info!(%user_id, %amount, %balance, "Wallet credited");
    Ok(DomainEvent::WalletCredited { user_id, amount, balance })
}

/// Pays for an order from the wallet. Fails without side effects when the
/// balance is short.
pub async fn pay(conn: &mut PgConnection, user_id: Uuid, amount: Money, description: &str, order_id: Uuid) -> Result<Money> {
    let mut wallet = db::wallet::lock_or_create(&mut *conn, user_id).await?;
    let balance = wallet.debit(amount)?;
    db::wallet::store_balance(&mut *conn, &wallet).await?;
    db::wallet::insert_entry(&mut *conn, user_id, LedgerDirection::Debit, amount, description, Some(order_id)).await?;
    db::transactions::insert(
        &mut *conn,
        &NewTransaction {
            user_id,
            kind: TransactionKind::WalletDebit,
            status: TransactionStatus::Credit,
            amount,
            description: description.to_string(),
            order_id: Some(order_id),
        },
    )
    .await?;
    info!(%user_id, %amount, %balance, "Wallet debited");
    Ok(balance)
}

/// Records money received outside the wallet (COD collection, gateway payment).
pub async fn record_receipt(
    conn: &mut PgConnection,
    user_id: Uuid,
    kind: TransactionKind,
    status: TransactionStatus,
    amount: Money,
    description: String,
    order_id: Uuid,
) -> Result<()> {
    db::transactions::insert(&mut *conn, &NewTransaction { user_id, kind, status, amount, description, order_id: Some(order_id) }).await?;
    Ok(())
}

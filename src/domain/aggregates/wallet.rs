//! Wallet and the money ledgers

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_direction", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerDirection {
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    WalletDebit,
    WalletCredit,
    Cod,
    OnlinePayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Debit,
    Credit,
    Failed,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Wallet {
    pub user_id: Uuid,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub direction: LedgerDirection,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Admin-facing ledger row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_id: String,
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A Transaction before it is written.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub amount: Money,
    pub description: String,
    pub order_id: Option<Uuid>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Insufficient wallet balance")]
    InsufficientBalance,
}

impl Wallet {
    pub fn empty(user_id: Uuid) -> Self { Self { user_id, balance: Money::zero(), updated_at: Utc::now() } }

    /// Returns the new balance.
    pub fn credit(&mut self, amount: Money) -> Result<Money, WalletError> {
        if !amount.is_positive() { return Err(WalletError::NonPositiveAmount); }
        self.balance += amount;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }

    pub fn debit(&mut self, amount: Money) -> Result<Money, WalletError> {
        if !amount.is_positive() { return Err(WalletError::NonPositiveAmount); }
        self.balance = self.balance.checked_sub(amount).ok_or(WalletError::InsufficientBalance)?;
        self.updated_at = Utc::now();
        Ok(self.balance)
    }
}

/// Fourteen random digits.
pub fn generate_transaction_id() -> String {
    let mut rng = rand::thread_rng();
    (0..14).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_never_negative() {
        let mut wallet = Wallet::empty(Uuid::now_v7());
        assert_eq!(wallet.debit(Money::from_major(1)), Err(WalletError::InsufficientBalance));
        assert_eq!(wallet.credit(Money::from_major(250)), Ok(Money::from_major(250)));
        assert_eq!(wallet.debit(Money::from_major(100)), Ok(Money::from_major(150)));
        assert_eq!(wallet.debit(Money::from_major(151)), Err(WalletError::InsufficientBalance));
        assert_eq!(wallet.balance, Money::from_major(150));
        assert_eq!(wallet.credit(Money::zero()), Err(WalletError::NonPositiveAmount));
    }

    #[test]
    fn test_transaction_id_is_fourteen_digits() {
        let id = generate_transaction_id();
        assert_eq!(id.len(), 14);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}

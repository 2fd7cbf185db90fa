//! Wallet ledger: cached balance plus an append-only transaction log.
//!
//! The cache is optimistic. [`WalletLedger::sync`] is the reconciliation
//! point where the remote ledger's balance replaces it wholesale.

mod issuance;

pub use issuance::{finalize_prescription, IssuanceOutcome};

use rusqlite::Connection;

use crate::db::SqliteWalletRepository;
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionKind, WalletBalance};
use crate::services::LocalStore;
use crate::util::now_millis;

/// Lower the cached balance by `cost`, flooring at zero, and log a debit.
///
/// Returns the new balance. Callers check affordability first.
pub(crate) fn debit(
    conn: &Connection,
    cost: i64,
    description: &str,
    reference_id: Option<&str>,
) -> Result<i64> {
    if cost < 0 {
        return Err(Error::InvalidInput(format!(
            "debit amount cannot be negative ({cost})"
        )));
    }

    let repo = SqliteWalletRepository::new(conn);
    let current = repo.load()?.balance;
    let balance = current.saturating_sub(cost).max(0);
    repo.store_balance(balance)?;

    let mut entry = Transaction::new(TransactionKind::Debit, current - balance, description);
    entry.reference_id = reference_id.map(str::to_string);
    repo.append(&entry)?;
    Ok(balance)
}

/// Wallet operations over a [`LocalStore`]
#[derive(Clone)]
pub struct WalletLedger {
    store: LocalStore,
}

impl WalletLedger {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn balance(&self) -> Result<WalletBalance> {
        self.store
            .with_connection(|conn| SqliteWalletRepository::new(conn).load())
    }

    pub fn can_afford(&self, cost: i64) -> Result<bool> {
        Ok(self.balance()?.balance >= cost)
    }

    /// Debit the cached balance. It never goes below zero.
    pub fn deduct(&self, cost: i64, description: &str) -> Result<i64> {
        self.store
            .with_transaction(|conn| debit(conn, cost, description, None))
    }

    /// Credit the cached balance and log it.
    pub fn recharge(&self, amount: i64) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::InvalidInput(format!(
                "recharge amount must be positive ({amount})"
            )));
        }

        let balance = self.store.with_transaction(|conn| {
            let repo = SqliteWalletRepository::new(conn);
            let balance = repo
                .load()?
                .balance
                .checked_add(amount)
                .ok_or_else(|| Error::InvalidInput("wallet balance overflow".to_string()))?;
            repo.store_balance(balance)?;
            repo.append(&Transaction::new(TransactionKind::Credit, amount, "Recharge"))?;
            Ok(balance)
        })?;

        tracing::info!("Wallet recharged by {amount}, balance {balance}");
        Ok(balance)
    }

    /// Replace the cached balance with the remote-confirmed value
    pub fn sync(&self, cloud_balance: i64) -> Result<WalletBalance> {
        let synced_at = now_millis();
        self.store.with_transaction(|conn| {
            SqliteWalletRepository::new(conn).store_synced(cloud_balance, synced_at)
        })?;
        tracing::debug!("Wallet cache set to remote balance {cloud_balance}");
        Ok(WalletBalance {
            balance: cloud_balance,
            last_synced_at: Some(synced_at),
        })
    }

    /// Recent ledger entries, newest first
    pub fn transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        self.store
            .with_connection(|conn| SqliteWalletRepository::new(conn).list(limit))
    }
}

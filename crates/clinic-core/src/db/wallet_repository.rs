//! Wallet cache and transaction log repository

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionKind, WalletBalance};

/// `SQLite` repository for the wallet cache row and ledger
pub struct SqliteWalletRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteWalletRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Cached balance; an uninitialized wallet reads as zero
    pub fn load(&self) -> Result<WalletBalance> {
        let cached = self
            .conn
            .query_row(
                "SELECT balance, last_synced_at FROM wallet_cache WHERE id = 1",
                [],
                |row| {
                    Ok(WalletBalance {
                        balance: row.get(0)?,
                        last_synced_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(cached.unwrap_or_default())
    }

    /// Overwrite the cached balance, keeping `last_synced_at`
    pub fn store_balance(&self, balance: i64) -> Result<()> {
        if balance < 0 {
            return Err(Error::InvalidInput(format!(
                "wallet balance cannot be negative ({balance})"
            )));
        }
        self.conn.execute(
            "INSERT INTO wallet_cache (id, balance) VALUES (1, ?)
             ON CONFLICT(id) DO UPDATE SET balance = excluded.balance",
            params![balance],
        )?;
        Ok(())
    }

    /// Overwrite the cached balance with a remote-confirmed value
    pub fn store_synced(&self, balance: i64, synced_at: i64) -> Result<()> {
        if balance < 0 {
            return Err(Error::InvalidInput(format!(
                "wallet balance cannot be negative ({balance})"
            )));
        }
        self.conn.execute(
            "INSERT INTO wallet_cache (id, balance, last_synced_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET balance = ?1, last_synced_at = ?2",
            params![balance, synced_at],
        )?;
        Ok(())
    }

    /// Append a ledger entry
    pub fn append(&self, entry: &Transaction) -> Result<()> {
        self.conn.execute(
            "INSERT INTO transactions (id, type, amount, description, reference_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.id,
                entry.kind.as_str(),
                entry.amount,
                entry.description,
                entry.reference_id,
                entry.created_at
            ],
        )?;
        Ok(())
    }

    /// Whether a debit referencing `reference_id` is already in the ledger
    pub fn has_debit_for(&self, reference_id: &str) -> Result<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM transactions WHERE type = ? AND reference_id = ?)",
            params![TransactionKind::Debit.as_str(), reference_id],
            |row| row.get(0),
        )?)
    }

    /// Ledger entries, newest first
    pub fn list(&self, limit: usize) -> Result<Vec<Transaction>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, type, amount, description, reference_id, created_at
             FROM transactions
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?",
        )?;
        let entries = stmt
            .query_map(params![limit], |row| {
                let kind: String = row.get(1)?;
                let kind = kind.parse::<TransactionKind>().map_err(|error| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(error),
                    )
                })?;
                Ok(Transaction {
                    id: row.get(0)?,
                    kind,
                    amount: row.get(2)?,
                    description: row.get(3)?,
                    reference_id: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::RecordId;

    #[test]
    fn test_uninitialized_wallet_reads_zero() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteWalletRepository::new(db.connection());
        assert_eq!(repo.load().unwrap(), WalletBalance::default());
    }

    #[test]
    fn test_store_balance_keeps_sync_stamp() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteWalletRepository::new(db.connection());

        repo.store_synced(10, 1_000).unwrap();
        repo.store_balance(7).unwrap();

        let wallet = repo.load().unwrap();
        assert_eq!(wallet.balance, 7);
        assert_eq!(wallet.last_synced_at, Some(1_000));
    }

    #[test]
    fn test_negative_balance_rejected() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteWalletRepository::new(db.connection());
        assert!(repo.store_balance(-1).is_err());
        assert!(repo.store_synced(-5, 1).is_err());
    }

    #[test]
    fn test_ledger_lists_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let repo = SqliteWalletRepository::new(db.connection());

        for (n, kind) in [TransactionKind::Credit, TransactionKind::Debit]
            .into_iter()
            .enumerate()
        {
            repo.append(&Transaction {
                id: RecordId::new(),
                kind,
                amount: 5,
                description: format!("entry {n}"),
                reference_id: None,
                created_at: 100 + i64::try_from(n).unwrap(),
            })
            .unwrap();
        }

        let entries = repo.list(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, TransactionKind::Debit);
        assert_eq!(entries[1].description, "entry 0");
    }
}

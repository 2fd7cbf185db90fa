//! Wallet models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::error::Error;

/// Cached wallet balance (singleton row)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Balance in credits; never negative
    pub balance: i64,
    /// When the balance was last overwritten by the remote ledger (Unix ms)
    pub last_synced_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(Error::InvalidInput(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// Append-only wallet ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    pub kind: TransactionKind,
    pub amount: i64,
    pub description: String,
    /// What the entry paid for, e.g. a prescription id
    pub reference_id: Option<String>,
    pub created_at: i64,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: i64, description: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            kind,
            amount,
            description: description.into(),
            reference_id: None,
            created_at: crate::util::now_millis(),
        }
    }
}

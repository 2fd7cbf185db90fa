//! Error types for clinic-core

use thiserror::Error;

use crate::models::QueueStatus;
use crate::sync::RemoteError;

/// Result type alias using clinic-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in clinic-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Queue item cannot move between these states
    #[error("Invalid queue transition: {from} -> {to}")]
    InvalidTransition { from: QueueStatus, to: QueueStatus },

    /// Wallet cannot cover the requested cost
    #[error("Insufficient wallet balance: {balance} available, {cost} required")]
    InsufficientBalance { balance: i64, cost: i64 },

    /// Remote store call failed
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl Error {
    /// Whether the error came from the network and is worth retrying later.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(error) if error.is_transient())
    }
}

//! Database layer for the clinic engine

mod connection;
mod cursor_repository;
mod migrations;
mod prescription_repository;
mod queue_repository;
mod records;
mod tables;
mod wallet_repository;

pub use connection::Database;
pub use cursor_repository::SqliteCursorRepository;
pub use prescription_repository::{PrescriptionItems, SqlitePrescriptionRepository};
pub use queue_repository::SqliteQueueRepository;
pub use records::{DirtyRecord, LocalOverwrite, RecordRepository, SyncAck};
pub use tables::SyncedRecord;
pub use wallet_repository::SqliteWalletRepository;

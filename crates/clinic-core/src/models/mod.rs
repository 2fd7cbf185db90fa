//! Data models for the clinic engine

mod entity;
mod patient;
mod prescription;
mod queue;
mod record_id;
mod reference;
mod sync_conflict;
mod sync_cursor;
mod wallet;

pub use entity::EntityKind;
pub use patient::Patient;
pub use prescription::{Prescription, PrescriptionLabTest, PrescriptionMedicine};
pub use queue::{QueueItem, QueueStatus};
pub use record_id::RecordId;
pub use reference::{CustomLabTest, CustomMedicine};
pub use sync_conflict::SyncConflict;
pub use sync_cursor::{CursorField, SyncCursor};
pub use wallet::{Transaction, TransactionKind, WalletBalance};

//! Reconciliation between the local store and the shared remote store.
//!
//! A cycle pushes every dirty row in one batch, acknowledges exactly the
//! rows that were sent, then pulls every remote change since the pull
//! cursor and applies it. Incoming rows win over local ones; when an
//! unsynced local edit is replaced the event lands in `sync_conflicts`.

mod cursor;
mod engine;
mod http;
mod pull;
mod push;
mod remote;
mod scheduler;
mod wire;

#[cfg(test)]
pub(crate) mod testing;

pub use cursor::SyncCursorManager;
pub use engine::{SyncEngine, SyncOutcome, SyncReport, SyncStatus, DEFAULT_REQUEST_TIMEOUT};
pub use http::HttpRemoteStore;
pub use pull::{apply_changes, pull_changes, restore_snapshot, ApplyReport, PullReport};
pub use push::{push_changes, PushReport};
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use scheduler::{SyncScheduler, MIN_SYNC_INTERVAL};
pub use wire::{
    CustomLabTestRow, CustomMedicineRow, PatientRow, PrescriptionLabTestRow,
    PrescriptionMedicineRow, PrescriptionRow, PullRequest, PushBatch, PushResponse,
    RemoteChanges, WalletBalanceResponse, WireRecord,
};

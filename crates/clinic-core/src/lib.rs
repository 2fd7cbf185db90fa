//! clinic-core - Core library for the clinic engine
//!
//! This crate contains the offline-first local store, the sync engine that
//! reconciles it with the shared remote store, the daily patient queue and
//! the wallet ledger that gates prescription issuance.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;
pub mod wallet;

pub use error::{Error, Result};
pub use models::{EntityKind, Patient, Prescription, QueueItem, QueueStatus, RecordId};
pub use services::LocalStore;

//! Sync conflict model

use serde::{Deserialize, Serialize};

/// A local unsynced edit that an incoming pull overwrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Wire name of the entity type
    pub entity: String,
    /// Record involved in the conflict
    pub record_id: String,
    /// Local row's timestamp when it was overwritten
    pub local_updated_at: i64,
    /// Incoming row's timestamp that replaced it
    pub incoming_updated_at: i64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}

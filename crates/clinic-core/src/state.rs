//! Shared cross-platform state types.

use serde::{Deserialize, Serialize};

/// Sync state reported by the engine to its front ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No cycle has run yet
    #[default]
    Idle,
    Syncing,
    Synced,
    /// Last cycle failed on the network; retried on the next trigger
    Offline,
    Error,
}

//! Sync cursor model

use serde::{Deserialize, Serialize};

/// Per-install device identity and sync watermarks (singleton row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncCursor {
    pub device_id: String,
    /// Server-acknowledged push completion time (Unix ms, 0 = never)
    pub last_pushed_at: i64,
    /// Server time of the last fully applied pull (Unix ms, 0 = never)
    pub last_pulled_at: i64,
}

/// Watermark selector for [`SyncCursor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorField {
    LastPushedAt,
    LastPulledAt,
}

impl CursorField {
    pub(crate) const fn column(self) -> &'static str {
        match self {
            Self::LastPushedAt => "last_pushed_at",
            Self::LastPulledAt => "last_pulled_at",
        }
    }
}

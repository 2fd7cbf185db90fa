//! Device identity and sync watermarks.

use crate::db::SqliteCursorRepository;
use crate::error::Result;
use crate::models::{CursorField, SyncCursor};
use crate::services::LocalStore;

/// Owns the singleton cursor row of one install
#[derive(Clone)]
pub struct SyncCursorManager {
    store: LocalStore,
}

impl SyncCursorManager {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Current cursor, created with a fresh device id on first access
    pub fn get(&self) -> Result<SyncCursor> {
        self.store
            .with_connection(|conn| SqliteCursorRepository::new(conn).get_or_create())
    }

    /// Stable identifier of this install
    pub fn device_id(&self) -> Result<String> {
        Ok(self.get()?.device_id)
    }

    /// Move one watermark forward. Older values are ignored.
    pub fn advance(&self, field: CursorField, value: i64) -> Result<i64> {
        self.store
            .with_transaction(|conn| SqliteCursorRepository::new(conn).advance(field, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clinic.db");

        let device_id = {
            let manager = SyncCursorManager::new(LocalStore::open(&path).unwrap());
            manager.advance(CursorField::LastPulledAt, 500).unwrap();
            manager.device_id().unwrap()
        };

        let manager = SyncCursorManager::new(LocalStore::open(&path).unwrap());
        let cursor = manager.get().unwrap();
        assert_eq!(cursor.device_id, device_id);
        assert_eq!(cursor.last_pulled_at, 500);
        assert_eq!(cursor.last_pushed_at, 0);
    }

    #[test]
    fn advance_never_regresses() {
        let manager = SyncCursorManager::new(LocalStore::open_in_memory().unwrap());

        assert_eq!(manager.advance(CursorField::LastPushedAt, 20).unwrap(), 20);
        assert_eq!(manager.advance(CursorField::LastPushedAt, 10).unwrap(), 20);
        assert_eq!(manager.get().unwrap().last_pushed_at, 20);
        assert_eq!(manager.get().unwrap().last_pulled_at, 0);
    }
}

//! Sync cursor repository implementation

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CursorField, SyncCursor};

/// `SQLite` repository for the singleton sync cursor row
pub struct SqliteCursorRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCursorRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Load the cursor, creating it with a fresh device id on first access
    pub fn get_or_create(&self) -> Result<SyncCursor> {
        if let Some(cursor) = self.load()? {
            return Ok(cursor);
        }

        let device_id = Uuid::now_v7().to_string();
        self.conn.execute(
            "INSERT OR IGNORE INTO sync_cursor (id, device_id, last_pushed_at, last_pulled_at)
             VALUES (1, ?, 0, 0)",
            params![device_id],
        )?;
        tracing::info!("Registered sync device {device_id}");

        self.load()?
            .ok_or_else(|| crate::Error::Database("sync cursor row missing".into()))
    }

    fn load(&self) -> Result<Option<SyncCursor>> {
        Ok(self
            .conn
            .query_row(
                "SELECT device_id, last_pushed_at, last_pulled_at FROM sync_cursor WHERE id = 1",
                [],
                |row| {
                    Ok(SyncCursor {
                        device_id: row.get(0)?,
                        last_pushed_at: row.get(1)?,
                        last_pulled_at: row.get(2)?,
                    })
                },
            )
            .optional()?)
    }

    /// Move a watermark forward; an older value never replaces a newer one.
    ///
    /// Returns the stored value after the update.
    pub fn advance(&self, field: CursorField, value: i64) -> Result<i64> {
        self.get_or_create()?;
        let column = field.column();
        self.conn.execute(
            &format!("UPDATE sync_cursor SET {column} = MAX({column}, ?) WHERE id = 1"),
            params![value],
        )?;
        Ok(self.conn.query_row(
            &format!("SELECT {column} FROM sync_cursor WHERE id = 1"),
            [],
            |row| row.get(0),
        )?)
    }
}

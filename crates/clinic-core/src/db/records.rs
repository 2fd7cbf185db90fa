//! Dirty-tracked record storage shared by every synchronized table

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::tables::SyncedRecord;
use crate::error::{Error, Result};
use crate::models::{EntityKind, RecordId, SyncConflict};
use crate::util::now_millis;

/// Strategy label recorded when a pull replaces an unsynced local row
pub const REMOTE_WINS: &str = "remote-wins";

/// A dirty row together with the local version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct DirtyRecord<T> {
    pub record: T,
    pub local_version: i64,
}

/// Acknowledgment handle for one pushed row.
///
/// Clearing the dirty flag only succeeds while the row is still at the
/// version that was pushed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAck {
    pub id: RecordId,
    pub local_version: i64,
}

/// Unsynced local state that an applied remote row replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOverwrite {
    pub kind: EntityKind,
    pub id: RecordId,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
}

/// Generic repository over the synchronized tables
pub struct RecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> RecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn select_sql<T: SyncedRecord>() -> String {
        format!("SELECT {} FROM {}", T::COLUMNS.join(", "), T::KIND.table())
    }

    fn upsert<T: SyncedRecord>(&self, record: &T, dirty: bool) -> Result<()> {
        let columns = T::COLUMNS;
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let updates = columns
            .iter()
            .skip(1)
            .map(|column| format!("{column} = excluded.{column}"))
            .collect::<Vec<_>>()
            .join(", ");

        let sql = format!(
            "INSERT INTO {table} ({columns}, is_dirty) VALUES ({placeholders})
             ON CONFLICT(id) DO UPDATE SET {updates},
                 is_dirty = excluded.is_dirty,
                 local_version = local_version + 1",
            table = T::KIND.table(),
            columns = columns.join(", "),
        );

        let mut values = record.to_values();
        values.push(Value::Integer(i64::from(dirty)));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Persist a local write: stamps `updated_at` and marks the row dirty
    pub fn write<T: SyncedRecord>(&self, record: &mut T) -> Result<()> {
        record.touch(now_millis());
        self.upsert(record, true)
    }

    /// Get a live (non-tombstoned) record by ID
    pub fn get<T: SyncedRecord>(&self, id: &RecordId) -> Result<Option<T>> {
        let sql = format!("{} WHERE id = ? AND is_deleted = 0", Self::select_sql::<T>());
        Ok(self
            .conn
            .query_row(&sql, params![id], T::from_row)
            .optional()?)
    }

    /// Get a record by ID including tombstones
    #[cfg(test)]
    pub fn get_any<T: SyncedRecord>(&self, id: &RecordId) -> Result<Option<T>> {
        let sql = format!("{} WHERE id = ?", Self::select_sql::<T>());
        Ok(self
            .conn
            .query_row(&sql, params![id], T::from_row)
            .optional()?)
    }

    /// List live records, most recently updated first
    pub fn list<T: SyncedRecord>(&self) -> Result<Vec<T>> {
        let sql = format!(
            "{} WHERE is_deleted = 0 ORDER BY updated_at DESC",
            Self::select_sql::<T>()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], T::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Tombstone a live record so the deletion itself is synchronized
    pub fn tombstone(&self, kind: EntityKind, id: &RecordId) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET is_deleted = 1, updated_at = ?, is_dirty = 1,
                 local_version = local_version + 1
             WHERE id = ? AND is_deleted = 0",
            kind.table()
        );
        let rows = self.conn.execute(&sql, params![now_millis(), id])?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// All rows of `T` with unacknowledged local changes, tombstones included
    pub fn query_dirty<T: SyncedRecord>(&self) -> Result<Vec<DirtyRecord<T>>> {
        let sql = format!(
            "SELECT {}, local_version FROM {} WHERE is_dirty = 1",
            T::COLUMNS.join(", "),
            T::KIND.table()
        );
        let version_index = T::COLUMNS.len();
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| {
                Ok(DirtyRecord {
                    record: T::from_row(row)?,
                    local_version: row.get(version_index)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Clear the dirty flag for exactly the acknowledged rows.
    ///
    /// Rows written again since they were gathered keep their flag. Returns
    /// the number of rows cleared.
    pub fn mark_synced(&self, kind: EntityKind, acks: &[SyncAck]) -> Result<usize> {
        let sql = format!(
            "UPDATE {} SET is_dirty = 0 WHERE id = ? AND local_version = ? AND is_dirty = 1",
            kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut cleared = 0;
        for ack in acks {
            cleared += stmt.execute(params![ack.id, ack.local_version])?;
        }
        Ok(cleared)
    }

    /// Physically drop acknowledged tombstones; the remote has recorded them
    pub fn purge_synced_tombstones(&self, kind: EntityKind, acks: &[SyncAck]) -> Result<usize> {
        let sql = format!(
            "DELETE FROM {} WHERE id = ? AND local_version = ? AND is_deleted = 1 AND is_dirty = 0",
            kind.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut purged = 0;
        for ack in acks {
            purged += stmt.execute(params![ack.id, ack.local_version])?;
        }
        Ok(purged)
    }

    /// Whether the row is dirty; `None` when it does not exist locally
    pub fn is_dirty(&self, kind: EntityKind, id: &RecordId) -> Result<Option<bool>> {
        let sql = format!("SELECT is_dirty FROM {} WHERE id = ?", kind.table());
        Ok(self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?)
    }

    /// `updated_at` of the row if it exists and carries unsynced changes
    pub fn dirty_updated_at(&self, kind: EntityKind, id: &RecordId) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT updated_at FROM {} WHERE id = ? AND is_dirty = 1",
            kind.table()
        );
        Ok(self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?)
    }

    /// Number of dirty rows in one table
    pub fn dirty_count(&self, kind: EntityKind) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE is_dirty = 1", kind.table());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Apply a remote row: insert or overwrite by id and mark it synced.
    ///
    /// The incoming row always wins. If it replaces a dirty local row the
    /// overwritten state is returned so the caller can record it.
    pub fn apply_remote<T: SyncedRecord>(&self, record: &T) -> Result<Option<LocalOverwrite>> {
        let local_updated_at = self.dirty_updated_at(T::KIND, record.id())?;

        self.upsert(record, false)?;

        Ok(local_updated_at.map(|local_updated_at| LocalOverwrite {
            kind: T::KIND,
            id: record.id().clone(),
            local_updated_at,
            incoming_updated_at: record.updated_at(),
        }))
    }

    /// Physically remove a row; returns whether it existed
    pub fn remove(&self, kind: EntityKind, id: &RecordId) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        Ok(self.conn.execute(&sql, params![id])? > 0)
    }

    /// Record a pull that replaced an unsynced local edit
    pub fn record_conflict(&self, overwrite: &LocalOverwrite) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_conflicts (
                 entity, record_id, local_updated_at, incoming_updated_at, resolved_at, strategy
             ) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                overwrite.kind.wire_name(),
                overwrite.id,
                overwrite.local_updated_at,
                overwrite.incoming_updated_at,
                now_millis(),
                REMOTE_WINS
            ],
        )?;
        Ok(())
    }

    /// List recorded conflicts, newest first
    pub fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(
            "SELECT id, entity, record_id, local_updated_at, incoming_updated_at,
                    resolved_at, strategy
             FROM sync_conflicts
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;
        let conflicts = stmt
            .query_map(params![limit], |row| {
                Ok(SyncConflict {
                    id: row.get(0)?,
                    entity: row.get(1)?,
                    record_id: row.get(2)?,
                    local_updated_at: row.get(3)?,
                    incoming_updated_at: row.get(4)?,
                    resolved_at: row.get(5)?,
                    strategy: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(conflicts)
    }
}

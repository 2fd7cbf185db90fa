//! Queue repository implementation

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{QueueItem, QueueStatus, RecordId};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_QUEUE: &str = "SELECT id, patient_id, token_number, queue_date, status,
        created_at, started_at, completed_at, updated_at
     FROM queue";

/// `SQLite` repository for the device-local daily queue
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn day_key(day: NaiveDate) -> String {
        day.format(DATE_FORMAT).to_string()
    }

    /// Parse a queue item from a database row
    fn parse_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueItem> {
        let day: String = row.get(3)?;
        let status: String = row.get(4)?;
        let to_sql_error = |index: usize, error: Box<dyn std::error::Error + Send + Sync>| {
            rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, error)
        };

        Ok(QueueItem {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            token_number: row.get(2)?,
            queue_date: NaiveDate::parse_from_str(&day, DATE_FORMAT)
                .map_err(|error| to_sql_error(3, Box::new(error)))?,
            status: status
                .parse::<QueueStatus>()
                .map_err(|error| to_sql_error(4, Box::new(error)))?,
            created_at: row.get(5)?,
            started_at: row.get(6)?,
            completed_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Next token for the day: `max(existing tokens) + 1`, starting at 1
    pub fn next_token(&self, day: NaiveDate) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(token_number), 0) + 1 FROM queue WHERE queue_date = ?",
            params![Self::day_key(day)],
            |row| row.get(0),
        )?)
    }

    pub fn insert(&self, item: &QueueItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO queue (
                 id, patient_id, token_number, queue_date, status,
                 created_at, started_at, completed_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                item.id,
                item.patient_id,
                item.token_number,
                Self::day_key(item.queue_date),
                item.status.as_str(),
                item.created_at,
                item.started_at,
                item.completed_at,
                item.updated_at
            ],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &RecordId) -> Result<Option<QueueItem>> {
        Ok(self
            .conn
            .query_row(
                &format!("{SELECT_QUEUE} WHERE id = ?"),
                params![id],
                Self::parse_item,
            )
            .optional()?)
    }

    /// All items of one day in token order
    pub fn list_for_day(&self, day: NaiveDate) -> Result<Vec<QueueItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_QUEUE} WHERE queue_date = ? ORDER BY token_number"))?;
        let items = stmt
            .query_map(params![Self::day_key(day)], Self::parse_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Items of one day in the given status, in token order
    pub fn list_by_status(&self, day: NaiveDate, status: QueueStatus) -> Result<Vec<QueueItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_QUEUE} WHERE queue_date = ? AND status = ? ORDER BY token_number"
        ))?;
        let items = stmt
            .query_map(
                params![Self::day_key(day), status.as_str()],
                Self::parse_item,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Move an item from `from` to `to`, stamping `started_at` or
    /// `completed_at` as the target state requires.
    ///
    /// The update only applies while the row is still in `from`.
    pub fn update_status(
        &self,
        id: &RecordId,
        from: QueueStatus,
        to: QueueStatus,
        now: i64,
    ) -> Result<()> {
        let (started_at, completed_at) = match to {
            QueueStatus::InProgress => (Some(now), None),
            QueueStatus::Completed | QueueStatus::Cancelled => (None, Some(now)),
            QueueStatus::Waiting => (None, None),
        };

        let rows = self.conn.execute(
            "UPDATE queue
             SET status = ?,
                 started_at = COALESCE(?, started_at),
                 completed_at = COALESCE(?, completed_at),
                 updated_at = ?
             WHERE id = ? AND status = ?",
            params![to.as_str(), started_at, completed_at, now, id, from.as_str()],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

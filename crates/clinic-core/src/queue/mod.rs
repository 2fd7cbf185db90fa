//! Daily patient queue.
//!
//! Items start `waiting` with the next token of their day and move through
//! `in_progress` to a terminal `completed` or `cancelled`. A waiting item
//! may also be cancelled directly. Queue rows stay on this device.
//!
//! At most one item is expected to be in progress at a time, but that is
//! left to the caller; [`QueueService::current`] reports the first one.

use chrono::NaiveDate;

use crate::db::{RecordRepository, SqliteQueueRepository};
use crate::error::{Error, Result};
use crate::models::{Patient, QueueItem, QueueStatus, RecordId};
use crate::services::LocalStore;
use crate::util::{local_today, now_millis};

#[derive(Clone)]
pub struct QueueService {
    store: LocalStore,
}

impl QueueService {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Add a patient to today's queue
    pub fn enqueue(&self, patient_id: &RecordId) -> Result<QueueItem> {
        self.enqueue_on(patient_id, local_today())
    }

    /// Add a patient to the queue of `day` with the next free token
    pub fn enqueue_on(&self, patient_id: &RecordId, day: NaiveDate) -> Result<QueueItem> {
        let item = self.store.with_transaction(|conn| {
            if RecordRepository::new(conn)
                .get::<Patient>(patient_id)?
                .is_none()
            {
                return Err(Error::NotFound(patient_id.to_string()));
            }

            let repo = SqliteQueueRepository::new(conn);
            let now = now_millis();
            let item = QueueItem {
                id: RecordId::new(),
                patient_id: patient_id.clone(),
                token_number: repo.next_token(day)?,
                queue_date: day,
                status: QueueStatus::Waiting,
                created_at: now,
                started_at: None,
                completed_at: None,
                updated_at: now,
            };
            repo.insert(&item)?;
            Ok(item)
        })?;

        tracing::debug!("Queued patient {patient_id} as token {}", item.token_number);
        Ok(item)
    }

    /// `waiting -> in_progress`
    pub fn start(&self, id: &RecordId) -> Result<QueueItem> {
        self.transition(id, QueueStatus::InProgress)
    }

    /// `in_progress -> completed`
    pub fn complete(&self, id: &RecordId) -> Result<QueueItem> {
        self.transition(id, QueueStatus::Completed)
    }

    /// `waiting | in_progress -> cancelled`
    pub fn cancel(&self, id: &RecordId) -> Result<QueueItem> {
        self.transition(id, QueueStatus::Cancelled)
    }

    fn transition(&self, id: &RecordId, to: QueueStatus) -> Result<QueueItem> {
        self.store.with_transaction(|conn| {
            let repo = SqliteQueueRepository::new(conn);
            let item = repo
                .get(id)?
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            if !item.status.can_transition_to(to) {
                if item.status.is_terminal() {
                    tracing::debug!("Queue item {id} is already {}", item.status);
                }
                return Err(Error::InvalidTransition {
                    from: item.status,
                    to,
                });
            }

            repo.update_status(id, item.status, to, now_millis())?;
            repo.get(id)?.ok_or_else(|| Error::NotFound(id.to_string()))
        })
    }

    pub fn get(&self, id: &RecordId) -> Result<Option<QueueItem>> {
        self.store
            .with_connection(|conn| SqliteQueueRepository::new(conn).get(id))
    }

    /// All items of one day in token order
    pub fn list_for_day(&self, day: NaiveDate) -> Result<Vec<QueueItem>> {
        self.store
            .with_connection(|conn| SqliteQueueRepository::new(conn).list_for_day(day))
    }

    /// The item currently being seen on `day`, if any
    pub fn current(&self, day: NaiveDate) -> Result<Option<QueueItem>> {
        let in_progress = self.store.with_connection(|conn| {
            SqliteQueueRepository::new(conn).list_by_status(day, QueueStatus::InProgress)
        })?;
        Ok(in_progress.into_iter().next())
    }
}

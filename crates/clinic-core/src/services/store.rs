//! Shared local store handle.
//!
//! The UI and the sync engine read and write the same database through
//! clones of one [`LocalStore`]. Every call holds the connection for its
//! whole duration, so each logical operation is atomic with respect to
//! the others. No call suspends.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{
    Database, DirtyRecord, PrescriptionItems, RecordRepository, SqlitePrescriptionRepository,
    SyncAck, SyncedRecord,
};
use crate::error::{Error, Result};
use crate::models::{EntityKind, Prescription, RecordId, SyncConflict};

/// Thread-safe handle to the device-local store.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open a store at the given filesystem path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    /// Wrap an already opened database.
    pub fn from_database(db: Database) -> Self {
        let path = db.path().map(Path::to_path_buf);
        Self {
            db: Arc::new(Mutex::new(db)),
            path,
        }
    }

    /// Filesystem location, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|_| Error::Database("local store connection poisoned".to_string()))
    }

    /// Run read or single-statement work against the connection.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let db = self.lock()?;
        f(db.connection())
    }

    /// Run `f` inside one write transaction.
    ///
    /// The transaction commits only if `f` succeeds; on error every effect
    /// of `f` is rolled back.
    pub fn with_transaction<R>(&self, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Persist a local create or edit and mark it dirty.
    pub fn save<T: SyncedRecord>(&self, record: &mut T) -> Result<()> {
        self.with_connection(|conn| RecordRepository::new(conn).write(record))
    }

    /// Fetch a live record by ID.
    pub fn get<T: SyncedRecord>(&self, id: &RecordId) -> Result<Option<T>> {
        self.with_connection(|conn| RecordRepository::new(conn).get(id))
    }

    /// List live records, most recently updated first.
    pub fn list<T: SyncedRecord>(&self) -> Result<Vec<T>> {
        self.with_connection(|conn| RecordRepository::new(conn).list())
    }

    /// Delete a record locally by tombstoning it.
    ///
    /// Prescriptions take their line items with them.
    pub fn delete<T: SyncedRecord>(&self, id: &RecordId) -> Result<()> {
        self.with_transaction(|conn| match T::KIND {
            EntityKind::Prescriptions => {
                SqlitePrescriptionRepository::new(conn).tombstone_cascade(id)
            }
            kind => RecordRepository::new(conn).tombstone(kind, id),
        })
    }

    /// Dirty rows of one entity type.
    pub fn query_dirty<T: SyncedRecord>(&self) -> Result<Vec<DirtyRecord<T>>> {
        self.with_connection(|conn| RecordRepository::new(conn).query_dirty())
    }

    /// Clear the dirty flag for exactly the acknowledged rows.
    pub fn mark_synced(&self, kind: EntityKind, acks: &[SyncAck]) -> Result<usize> {
        self.with_transaction(|conn| RecordRepository::new(conn).mark_synced(kind, acks))
    }

    /// Whether a row is dirty; `None` when it is not stored locally.
    pub fn is_dirty(&self, kind: EntityKind, id: &RecordId) -> Result<Option<bool>> {
        self.with_connection(|conn| RecordRepository::new(conn).is_dirty(kind, id))
    }

    /// Dirty row counts per synchronized table.
    pub fn dirty_counts(&self) -> Result<Vec<(EntityKind, usize)>> {
        self.with_connection(|conn| {
            let repo = RecordRepository::new(conn);
            EntityKind::ALL
                .into_iter()
                .map(|kind| repo.dirty_count(kind).map(|count| (kind, count)))
                .collect()
        })
    }

    /// Write a prescription and its line items atomically.
    pub fn save_prescription(
        &self,
        prescription: &mut Prescription,
        items: &mut PrescriptionItems,
    ) -> Result<()> {
        self.with_transaction(|conn| {
            SqlitePrescriptionRepository::new(conn).save(prescription, items)
        })
    }

    /// Live line items of a prescription.
    pub fn prescription_items(&self, id: &RecordId) -> Result<PrescriptionItems> {
        self.with_connection(|conn| SqlitePrescriptionRepository::new(conn).items(id))
    }

    /// Physically delete a prescription and its owned children.
    pub fn delete_prescription_cascade(&self, id: &RecordId) -> Result<bool> {
        self.with_transaction(|conn| SqlitePrescriptionRepository::new(conn).delete_cascade(id))
    }

    /// Recently recorded remote-wins overwrites.
    pub fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        self.with_connection(|conn| RecordRepository::new(conn).list_conflicts(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, PrescriptionLabTest, PrescriptionMedicine};

    #[test]
    fn in_memory_save_and_list_roundtrip() {
        let store = LocalStore::open_in_memory().unwrap();

        let mut patient = Patient::new("Ravi");
        store.save(&mut patient).unwrap();

        let patients = store.list::<Patient>().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].name, "Ravi");
    }

    #[test]
    fn clones_share_one_database() {
        let store = LocalStore::open_in_memory().unwrap();
        let other = store.clone();

        let mut patient = Patient::new("Shared");
        store.save(&mut patient).unwrap();

        assert!(other.get::<Patient>(&patient.id).unwrap().is_some());
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let store = LocalStore::open_in_memory().unwrap();
        let mut patient = Patient::new("Rolled back");

        let result: Result<()> = store.with_transaction(|conn| {
            RecordRepository::new(conn).write(&mut patient)?;
            Err(Error::InvalidInput("abort".into()))
        });

        assert!(result.is_err());
        assert!(store.get::<Patient>(&patient.id).unwrap().is_none());
    }

    #[test]
    fn deleting_prescription_tombstones_line_items() {
        let store = LocalStore::open_in_memory().unwrap();
        let mut prescription = Prescription::new(RecordId::new());
        let mut items = PrescriptionItems {
            medicines: vec![PrescriptionMedicine::new(prescription.id.clone(), "ORS")],
            lab_tests: vec![PrescriptionLabTest::new(prescription.id.clone(), "Urinalysis")],
        };
        store.save_prescription(&mut prescription, &mut items).unwrap();

        store.delete::<Prescription>(&prescription.id).unwrap();

        assert!(store.get::<Prescription>(&prescription.id).unwrap().is_none());
        assert!(store.prescription_items(&prescription.id).unwrap().is_empty());
        assert_eq!(
            store
                .is_dirty(EntityKind::PrescriptionMedicines, &items.medicines[0].id)
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn dirty_counts_cover_every_table() {
        let store = LocalStore::open_in_memory().unwrap();
        let mut patient = Patient::new("Counted");
        store.save(&mut patient).unwrap();

        let counts = store.dirty_counts().unwrap();
        assert_eq!(counts.len(), EntityKind::ALL.len());
        assert!(counts.contains(&(EntityKind::Patients, 1)));
        assert!(counts.contains(&(EntityKind::Prescriptions, 0)));
    }
}

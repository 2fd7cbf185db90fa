//! Prescription storage with owned line items

use rusqlite::{params, Connection, OptionalExtension};

use super::records::RecordRepository;
use super::tables::SyncedRecord;
use crate::error::{Error, Result};
use crate::models::{
    EntityKind, Prescription, PrescriptionLabTest, PrescriptionMedicine, RecordId,
};
use crate::util::now_millis;

/// The child collections owned by one prescription
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionItems {
    pub medicines: Vec<PrescriptionMedicine>,
    pub lab_tests: Vec<PrescriptionLabTest>,
}

impl PrescriptionItems {
    pub fn is_empty(&self) -> bool {
        self.medicines.is_empty() && self.lab_tests.is_empty()
    }
}

/// `SQLite` repository for prescriptions and their children
pub struct SqlitePrescriptionRepository<'a> {
    conn: &'a Connection,
    records: RecordRepository<'a>,
}

impl<'a> SqlitePrescriptionRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            records: RecordRepository::new(conn),
        }
    }

    /// Write a prescription and its line items.
    ///
    /// Run inside a transaction so the parent never lands without its items.
    pub fn save(
        &self,
        prescription: &mut Prescription,
        items: &mut PrescriptionItems,
    ) -> Result<()> {
        let foreign = items
            .medicines
            .iter()
            .map(|medicine| &medicine.prescription_id)
            .chain(items.lab_tests.iter().map(|test| &test.prescription_id))
            .find(|parent| **parent != prescription.id);
        if let Some(parent) = foreign {
            return Err(Error::InvalidInput(format!(
                "line item belongs to prescription {parent}, not {}",
                prescription.id
            )));
        }

        self.records.write(prescription)?;
        for medicine in &mut items.medicines {
            self.records.write(medicine)?;
        }
        for test in &mut items.lab_tests {
            self.records.write(test)?;
        }
        Ok(())
    }

    /// Live line items for a prescription
    pub fn items(&self, id: &RecordId) -> Result<PrescriptionItems> {
        Ok(PrescriptionItems {
            medicines: self.children::<PrescriptionMedicine>(id)?,
            lab_tests: self.children::<PrescriptionLabTest>(id)?,
        })
    }

    fn children<T: SyncedRecord>(&self, id: &RecordId) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE prescription_id = ? AND is_deleted = 0 ORDER BY created_at",
            T::COLUMNS.join(", "),
            T::KIND.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let children = stmt
            .query_map(params![id], T::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(children)
    }

    /// Tombstone a prescription together with its live line items
    pub fn tombstone_cascade(&self, id: &RecordId) -> Result<()> {
        let now = now_millis();
        for kind in [EntityKind::PrescriptionMedicines, EntityKind::PrescriptionLabTests] {
            let sql = format!(
                "UPDATE {} SET is_deleted = 1, updated_at = ?, is_dirty = 1,
                     local_version = local_version + 1
                 WHERE prescription_id = ? AND is_deleted = 0",
                kind.table()
            );
            self.conn.execute(&sql, params![now, id])?;
        }
        self.records.tombstone(EntityKind::Prescriptions, id)
    }

    /// Physically delete a prescription and every owned child row.
    ///
    /// Returns whether the prescription row existed.
    pub fn delete_cascade(&self, id: &RecordId) -> Result<bool> {
        for kind in [EntityKind::PrescriptionMedicines, EntityKind::PrescriptionLabTests] {
            let sql = format!("DELETE FROM {} WHERE prescription_id = ?", kind.table());
            self.conn.execute(&sql, params![id])?;
        }
        self.records.remove(EntityKind::Prescriptions, id)
    }

    /// Deduction flag of a live prescription; `None` if it does not exist
    pub fn wallet_deducted(&self, id: &RecordId) -> Result<Option<bool>> {
        Ok(self
            .conn
            .query_row(
                "SELECT wallet_deducted FROM prescriptions WHERE id = ? AND is_deleted = 0",
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Set the deduction flag and finalization stamp, re-dirtying the row
    pub fn mark_deducted(&self, id: &RecordId) -> Result<()> {
        let now = now_millis();
        let rows = self.conn.execute(
            "UPDATE prescriptions
             SET wallet_deducted = 1,
                 finalized_at = COALESCE(finalized_at, ?1),
                 updated_at = ?1,
                 is_dirty = 1,
                 local_version = local_version + 1
             WHERE id = ?2 AND is_deleted = 0 AND wallet_deducted = 0",
            params![now, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }
}

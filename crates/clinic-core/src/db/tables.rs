//! Column mappings for the synchronized tables

use rusqlite::types::Value;
use rusqlite::Row;

use crate::models::{
    CustomLabTest, CustomMedicine, EntityKind, Patient, Prescription, PrescriptionLabTest,
    PrescriptionMedicine, RecordId,
};

/// A row type stored in one of the synchronized tables.
///
/// `COLUMNS` lists the persisted domain columns with `id` first; `to_values`
/// and `from_row` use the same order. The sync bookkeeping columns
/// (`is_dirty`, `local_version`) are owned by [`super::RecordRepository`].
pub trait SyncedRecord: Sized {
    const KIND: EntityKind;
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> &RecordId;
    fn updated_at(&self) -> i64;
    fn touch(&mut self, now: i64);
    fn is_deleted(&self) -> bool;
    fn to_values(&self) -> Vec<Value>;
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn opt_text(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |value| Value::Text(value.clone()))
}

fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

macro_rules! sync_meta {
    () => {
        fn id(&self) -> &RecordId {
            &self.id
        }

        fn updated_at(&self) -> i64 {
            self.updated_at
        }

        fn touch(&mut self, now: i64) {
            self.updated_at = now;
        }

        fn is_deleted(&self) -> bool {
            self.is_deleted
        }
    };
}

impl SyncedRecord for Patient {
    const KIND: EntityKind = EntityKind::Patients;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "age",
        "gender",
        "weight",
        "phone",
        "address",
        "blood_group",
        "allergies",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(&self.name),
            opt_int(self.age),
            opt_text(self.gender.as_ref()),
            self.weight.map_or(Value::Null, Value::Real),
            opt_text(self.phone.as_ref()),
            opt_text(self.address.as_ref()),
            opt_text(self.blood_group.as_ref()),
            opt_text(self.allergies.as_ref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            gender: row.get(3)?,
            weight: row.get(4)?,
            phone: row.get(5)?,
            address: row.get(6)?,
            blood_group: row.get(7)?,
            allergies: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
            is_deleted: row.get(11)?,
        })
    }
}

impl SyncedRecord for Prescription {
    const KIND: EntityKind = EntityKind::Prescriptions;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "patient_id",
        "diagnosis",
        "advice",
        "follow_up_date",
        "wallet_deducted",
        "finalized_at",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.patient_id.as_str()),
            opt_text(self.diagnosis.as_ref()),
            opt_text(self.advice.as_ref()),
            opt_text(self.follow_up_date.as_ref()),
            flag(self.wallet_deducted),
            opt_int(self.finalized_at),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            diagnosis: row.get(2)?,
            advice: row.get(3)?,
            follow_up_date: row.get(4)?,
            wallet_deducted: row.get(5)?,
            finalized_at: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            is_deleted: row.get(9)?,
        })
    }
}

impl SyncedRecord for PrescriptionMedicine {
    const KIND: EntityKind = EntityKind::PrescriptionMedicines;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "prescription_id",
        "name",
        "dosage",
        "frequency",
        "duration",
        "instructions",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.prescription_id.as_str()),
            text(&self.name),
            opt_text(self.dosage.as_ref()),
            opt_text(self.frequency.as_ref()),
            opt_text(self.duration.as_ref()),
            opt_text(self.instructions.as_ref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            duration: row.get(5)?,
            instructions: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            is_deleted: row.get(9)?,
        })
    }
}

impl SyncedRecord for PrescriptionLabTest {
    const KIND: EntityKind = EntityKind::PrescriptionLabTests;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "prescription_id",
        "name",
        "instructions",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(self.prescription_id.as_str()),
            text(&self.name),
            opt_text(self.instructions.as_ref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            prescription_id: row.get(1)?,
            name: row.get(2)?,
            instructions: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            is_deleted: row.get(6)?,
        })
    }
}

impl SyncedRecord for CustomMedicine {
    const KIND: EntityKind = EntityKind::CustomMedicines;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "generic_name",
        "form",
        "strength",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(&self.name),
            opt_text(self.generic_name.as_ref()),
            opt_text(self.form.as_ref()),
            opt_text(self.strength.as_ref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            generic_name: row.get(2)?,
            form: row.get(3)?,
            strength: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            is_deleted: row.get(7)?,
        })
    }
}

impl SyncedRecord for CustomLabTest {
    const KIND: EntityKind = EntityKind::CustomLabTests;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "category",
        "created_at",
        "updated_at",
        "is_deleted",
    ];

    sync_meta!();

    fn to_values(&self) -> Vec<Value> {
        vec![
            text(self.id.as_str()),
            text(&self.name),
            opt_text(self.category.as_ref()),
            Value::Integer(self.created_at),
            Value::Integer(self.updated_at),
            flag(self.is_deleted),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            is_deleted: row.get(5)?,
        })
    }
}

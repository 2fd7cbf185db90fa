//! Wire format for push, pull and restore payloads.
//!
//! Each synchronized entity has one explicit row struct mirroring its
//! persisted columns in camelCase. Mapping between rows and models happens
//! only here, so the wire shape and the in-memory model can evolve
//! independently.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::SyncedRecord;
use crate::error::{Error, Result};
use crate::models::{
    CustomLabTest, CustomMedicine, EntityKind, Patient, Prescription, PrescriptionLabTest,
    PrescriptionMedicine, RecordId,
};

/// Integer 0/1 flags on the wire; booleans are accepted on input.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flag {
            Bool(bool),
            Int(i64),
        }

        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(value) => value,
            Flag::Int(value) => value != 0,
        })
    }
}

/// A model that has a wire row representation
pub trait WireRecord: SyncedRecord {
    type Row: Serialize + DeserializeOwned;

    fn to_wire(&self) -> Self::Row;
    fn from_wire(row: Self::Row) -> Result<Self>;
}

/// Wire ids are taken verbatim, never trimmed.
fn parse_id(raw: &str, field: &str) -> Result<RecordId> {
    if raw.trim() != raw {
        return Err(Error::InvalidInput(format!(
            "row field '{field}' must not contain surrounding whitespace"
        )));
    }
    raw.parse()
        .map_err(|_| Error::InvalidInput(format!("row field '{field}' must not be empty")))
}

fn required_text(raw: String, field: &str) -> Result<String> {
    crate::util::normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("row field '{field}' must not be empty")))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for Patient {
    type Row = PatientRow;

    fn to_wire(&self) -> PatientRow {
        PatientRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            age: self.age,
            gender: self.gender.clone(),
            weight: self.weight,
            phone: self.phone.clone(),
            address: self.address.clone(),
            blood_group: self.blood_group.clone(),
            allergies: self.allergies.clone(),
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: PatientRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            name: required_text(row.name, "name")?,
            age: row.age,
            gender: row.gender,
            weight: row.weight,
            phone: row.phone,
            address: row.address,
            blood_group: row.blood_group,
            allergies: row.allergies,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRow {
    pub id: String,
    pub patient_id: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<String>,
    #[serde(with = "flag", default)]
    pub wallet_deducted: bool,
    #[serde(default)]
    pub finalized_at: Option<i64>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for Prescription {
    type Row = PrescriptionRow;

    fn to_wire(&self) -> PrescriptionRow {
        PrescriptionRow {
            id: self.id.to_string(),
            patient_id: self.patient_id.to_string(),
            diagnosis: self.diagnosis.clone(),
            advice: self.advice.clone(),
            follow_up_date: self.follow_up_date.clone(),
            wallet_deducted: self.wallet_deducted,
            finalized_at: self.finalized_at,
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: PrescriptionRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            patient_id: parse_id(&row.patient_id, "patientId")?,
            diagnosis: row.diagnosis,
            advice: row.advice,
            follow_up_date: row.follow_up_date,
            wallet_deducted: row.wallet_deducted,
            finalized_at: row.finalized_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionMedicineRow {
    pub id: String,
    pub prescription_id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for PrescriptionMedicine {
    type Row = PrescriptionMedicineRow;

    fn to_wire(&self) -> PrescriptionMedicineRow {
        PrescriptionMedicineRow {
            id: self.id.to_string(),
            prescription_id: self.prescription_id.to_string(),
            name: self.name.clone(),
            dosage: self.dosage.clone(),
            frequency: self.frequency.clone(),
            duration: self.duration.clone(),
            instructions: self.instructions.clone(),
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: PrescriptionMedicineRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            prescription_id: parse_id(&row.prescription_id, "prescriptionId")?,
            name: required_text(row.name, "name")?,
            dosage: row.dosage,
            frequency: row.frequency,
            duration: row.duration,
            instructions: row.instructions,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionLabTestRow {
    pub id: String,
    pub prescription_id: String,
    pub name: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for PrescriptionLabTest {
    type Row = PrescriptionLabTestRow;

    fn to_wire(&self) -> PrescriptionLabTestRow {
        PrescriptionLabTestRow {
            id: self.id.to_string(),
            prescription_id: self.prescription_id.to_string(),
            name: self.name.clone(),
            instructions: self.instructions.clone(),
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: PrescriptionLabTestRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            prescription_id: parse_id(&row.prescription_id, "prescriptionId")?,
            name: required_text(row.name, "name")?,
            instructions: row.instructions,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMedicineRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub generic_name: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub strength: Option<String>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for CustomMedicine {
    type Row = CustomMedicineRow;

    fn to_wire(&self) -> CustomMedicineRow {
        CustomMedicineRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            generic_name: self.generic_name.clone(),
            form: self.form.clone(),
            strength: self.strength.clone(),
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: CustomMedicineRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            name: required_text(row.name, "name")?,
            generic_name: row.generic_name,
            form: row.form,
            strength: row.strength,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLabTestRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(with = "flag", default)]
    pub deleted: bool,
    #[serde(with = "flag", default)]
    pub synced: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl WireRecord for CustomLabTest {
    type Row = CustomLabTestRow;

    fn to_wire(&self) -> CustomLabTestRow {
        CustomLabTestRow {
            id: self.id.to_string(),
            name: self.name.clone(),
            category: self.category.clone(),
            deleted: self.is_deleted,
            synced: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn from_wire(row: CustomLabTestRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "id")?,
            name: required_text(row.name, "name")?,
            category: row.category,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.deleted,
        })
    }
}

/// Push request body: one array per entity type.
///
/// `device_id` lets the remote leave this device's own rows out of its
/// later pull responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushBatch {
    pub device_id: String,
    pub patients: Vec<PatientRow>,
    pub prescriptions: Vec<PrescriptionRow>,
    pub prescription_medicines: Vec<PrescriptionMedicineRow>,
    pub prescription_lab_tests: Vec<PrescriptionLabTestRow>,
    pub custom_medicines: Vec<CustomMedicineRow>,
    pub custom_lab_tests: Vec<CustomLabTestRow>,
}

impl PushBatch {
    /// Total number of rows across all entity types
    pub fn len(&self) -> usize {
        self.patients.len()
            + self.prescriptions.len()
            + self.prescription_medicines.len()
            + self.prescription_lab_tests.len()
            + self.custom_medicines.len()
            + self.custom_lab_tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    #[serde(default)]
    pub pushed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Exclusive lower bound (Unix ms); 0 on first run
    pub since: i64,
    pub device_id: String,
}

/// Pull and restore response.
///
/// Rows are kept as raw JSON so one malformed row can be skipped without
/// rejecting the rest of the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChanges {
    #[serde(default = "default_success")]
    pub success: bool,
    pub server_time: i64,
    #[serde(default)]
    pub patients: Vec<Value>,
    #[serde(default)]
    pub prescriptions: Vec<Value>,
    #[serde(default)]
    pub prescription_medicines: Vec<Value>,
    #[serde(default)]
    pub prescription_lab_tests: Vec<Value>,
    #[serde(default)]
    pub custom_medicines: Vec<Value>,
    #[serde(default)]
    pub custom_lab_tests: Vec<Value>,
}

const fn default_success() -> bool {
    true
}

impl RemoteChanges {
    /// Raw rows delivered for one entity type
    pub fn rows(&self, kind: EntityKind) -> &[Value] {
        match kind {
            EntityKind::Patients => &self.patients,
            EntityKind::Prescriptions => &self.prescriptions,
            EntityKind::PrescriptionMedicines => &self.prescription_medicines,
            EntityKind::PrescriptionLabTests => &self.prescription_lab_tests,
            EntityKind::CustomMedicines => &self.custom_medicines,
            EntityKind::CustomLabTests => &self.custom_lab_tests,
        }
    }

    /// Mutable access for building responses
    #[cfg(test)]
    pub fn rows_mut(&mut self, kind: EntityKind) -> &mut Vec<Value> {
        match kind {
            EntityKind::Patients => &mut self.patients,
            EntityKind::Prescriptions => &mut self.prescriptions,
            EntityKind::PrescriptionMedicines => &mut self.prescription_medicines,
            EntityKind::PrescriptionLabTests => &mut self.prescription_lab_tests,
            EntityKind::CustomMedicines => &mut self.custom_medicines,
            EntityKind::CustomLabTests => &mut self.custom_lab_tests,
        }
    }

    pub fn total_rows(&self) -> usize {
        EntityKind::ALL
            .into_iter()
            .map(|kind| self.rows(kind).len())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalanceResponse {
    pub balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn patient_row_uses_camel_case_and_integer_flags() {
        let mut patient = Patient::new("Kiran");
        patient.blood_group = Some("O+".to_string());
        patient.is_deleted = true;

        let value = serde_json::to_value(patient.to_wire()).unwrap();
        assert_eq!(value["bloodGroup"], json!("O+"));
        assert_eq!(value["deleted"], json!(1));
        assert_eq!(value["synced"], json!(0));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("blood_group").is_none());
    }

    #[test]
    fn flags_accept_booleans() {
        let row: CustomLabTestRow = serde_json::from_value(json!({
            "id": "t-1",
            "name": "TSH",
            "deleted": true,
            "createdAt": 1,
            "updatedAt": 2
        }))
        .unwrap();
        assert!(row.deleted);
        assert!(!row.synced);
    }

    #[test]
    fn from_wire_rejects_blank_ids_and_names() {
        let row = PrescriptionMedicineRow {
            id: " ".to_string(),
            prescription_id: "rx-1".to_string(),
            name: "Ibuprofen".to_string(),
            dosage: None,
            frequency: None,
            duration: None,
            instructions: None,
            deleted: false,
            synced: true,
            created_at: 1,
            updated_at: 1,
        };
        assert!(PrescriptionMedicine::from_wire(row.clone()).is_err());

        let row = PrescriptionMedicineRow {
            id: "m-1".to_string(),
            name: "   ".to_string(),
            ..row
        };
        assert!(PrescriptionMedicine::from_wire(row).is_err());
    }

    #[test]
    fn from_wire_rejects_padded_ids() {
        let mut row = Patient::new("Asha").to_wire();
        row.id = " p-1 ".to_string();
        let err = Patient::from_wire(row).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)), "{err:?}");

        let mut row = Prescription::new(RecordId::new()).to_wire();
        row.patient_id.push('\n');
        assert!(Prescription::from_wire(row).is_err());
    }

    #[test]
    fn prescription_wire_mapping_preserves_fields() {
        let mut prescription = Prescription::new(RecordId::new());
        prescription.diagnosis = Some("Viral fever".to_string());
        prescription.wallet_deducted = true;
        prescription.finalized_at = Some(55);

        let back = Prescription::from_wire(prescription.to_wire()).unwrap();
        assert_eq!(back, prescription);
    }

    #[test]
    fn remote_changes_default_missing_arrays() {
        let changes: RemoteChanges = serde_json::from_value(json!({
            "success": true,
            "serverTime": 1234,
            "patients": [{"id": "p-1"}]
        }))
        .unwrap();

        assert_eq!(changes.server_time, 1234);
        assert_eq!(changes.total_rows(), 1);
        assert!(changes.rows(EntityKind::CustomLabTests).is_empty());
    }

    #[test]
    fn push_batch_counts_rows() {
        let mut batch = PushBatch::default();
        assert!(batch.is_empty());
        batch.patients.push(Patient::new("A").to_wire());
        batch
            .custom_lab_tests
            .push(CustomLabTest::new("Vitamin D").to_wire());
        assert_eq!(batch.len(), 2);

        let value = serde_json::to_value(&batch).unwrap();
        assert!(value.get("customLabTests").is_some());
        assert!(value.get("prescriptionMedicines").is_some());
    }
}

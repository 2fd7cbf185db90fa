//! Prescription model and its owned line items

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::util::now_millis;

/// A prescription written for a patient.
///
/// Medicines and lab tests are owned children; removing the prescription
/// removes them too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: RecordId,
    pub patient_id: RecordId,
    pub diagnosis: Option<String>,
    pub advice: Option<String>,
    /// Follow-up day as `YYYY-MM-DD`
    pub follow_up_date: Option<String>,
    /// Set together with the wallet debit when the prescription is issued
    pub wallet_deducted: bool,
    pub finalized_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl Prescription {
    #[must_use]
    pub fn new(patient_id: RecordId) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            patient_id,
            diagnosis: None,
            advice: None,
            follow_up_date: None,
            wallet_deducted: false,
            finalized_at: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Whether the prescription has been issued
    pub const fn is_finalized(&self) -> bool {
        self.finalized_at.is_some()
    }
}

/// A medicine line on a prescription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionMedicine {
    pub id: RecordId,
    pub prescription_id: RecordId,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl PrescriptionMedicine {
    #[must_use]
    pub fn new(prescription_id: RecordId, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            prescription_id,
            name: name.into(),
            dosage: None,
            frequency: None,
            duration: None,
            instructions: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

/// A lab test ordered on a prescription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionLabTest {
    pub id: RecordId,
    pub prescription_id: RecordId,
    pub name: String,
    pub instructions: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl PrescriptionLabTest {
    #[must_use]
    pub fn new(prescription_id: RecordId, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            prescription_id,
            name: name.into(),
            instructions: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

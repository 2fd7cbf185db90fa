//! Patient model

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::util::now_millis;

/// A registered patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Unique identifier
    pub id: RecordId,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<String>,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
    /// Tombstone flag for sync
    pub is_deleted: bool,
}

impl Patient {
    /// Create a new patient with only a name set
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            name: name.into(),
            age: None,
            gender: None,
            weight: None,
            phone: None,
            address: None,
            blood_group: None,
            allergies: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_new() {
        let patient = Patient::new("Asha Rao");
        assert_eq!(patient.name, "Asha Rao");
        assert!(!patient.is_deleted);
        assert_eq!(patient.created_at, patient.updated_at);
    }
}

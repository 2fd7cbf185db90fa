//! Custom reference data added by clinicians.
//!
//! These are synchronized so every device of the same clinic offers the
//! same ad hoc medicines and lab tests.

use serde::{Deserialize, Serialize};

use super::RecordId;
use crate::util::now_millis;

/// A medicine missing from the bundled catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMedicine {
    pub id: RecordId,
    pub name: String,
    pub generic_name: Option<String>,
    /// Tablet, syrup, injection, ...
    pub form: Option<String>,
    pub strength: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl CustomMedicine {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            name: name.into(),
            generic_name: None,
            form: None,
            strength: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

/// A lab test missing from the bundled catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLabTest {
    pub id: RecordId,
    pub name: String,
    pub category: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub is_deleted: bool,
}

impl CustomLabTest {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: RecordId::new(),
            name: name.into(),
            category: None,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }
}

//! Synchronized entity types

use std::fmt;

/// Every table that takes part in push/pull synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Patients,
    Prescriptions,
    PrescriptionMedicines,
    PrescriptionLabTests,
    CustomMedicines,
    CustomLabTests,
}

impl EntityKind {
    /// All synchronized kinds, parents before their owned children.
    pub const ALL: [Self; 6] = [
        Self::Patients,
        Self::Prescriptions,
        Self::PrescriptionMedicines,
        Self::PrescriptionLabTests,
        Self::CustomMedicines,
        Self::CustomLabTests,
    ];

    /// Local table name
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Prescriptions => "prescriptions",
            Self::PrescriptionMedicines => "prescription_medicines",
            Self::PrescriptionLabTests => "prescription_lab_tests",
            Self::CustomMedicines => "custom_medicines",
            Self::CustomLabTests => "custom_lab_tests",
        }
    }

    /// Entity name used as the key in push and pull payloads
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Patients => "patients",
            Self::Prescriptions => "prescriptions",
            Self::PrescriptionMedicines => "prescriptionMedicines",
            Self::PrescriptionLabTests => "prescriptionLabTests",
            Self::CustomMedicines => "customMedicines",
            Self::CustomLabTests => "customLabTests",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

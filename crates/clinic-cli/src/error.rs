use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] clinic_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Patient name cannot be empty")]
    EmptyName,
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error(
        "Sync is not configured. Set CLINIC_API_URL (or api_base_url in the config file) and CLINIC_API_TOKEN to enable `clinic sync`."
    )]
    SyncNotConfigured,
}

impl CliError {
    /// Follow-up action for errors the user can fix
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Core(clinic_core::Error::InsufficientBalance { .. }) => {
                Some("Recharge with `clinic wallet recharge <amount>` and try again.")
            }
            Self::Core(error) if error.is_transient() => {
                Some("The device looks offline; local changes stay queued for the next sync.")
            }
            _ => None,
        }
    }
}

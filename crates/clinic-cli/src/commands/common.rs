use std::env;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use clinic_core::config::{ClinicConfig, SyncConfig};
use clinic_core::models::{SyncConflict, Transaction};
use clinic_core::sync::{HttpRemoteStore, SyncEngine};
use clinic_core::{LocalStore, Patient, QueueItem, RecordId};
use serde::Serialize;

use crate::error::CliError;

const API_URL_ENV: &str = "CLINIC_API_URL";
const API_TOKEN_ENV: &str = "CLINIC_API_TOKEN";

/// Resolved locations for one CLI invocation
#[derive(Debug, Clone)]
pub struct Context {
    pub db_path: PathBuf,
    pub config_path: PathBuf,
}

impl Context {
    pub fn new(db_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Self {
        Self {
            db_path: resolve_db_path(db_path),
            config_path: config_path.unwrap_or_else(default_config_path),
        }
    }

    pub fn open_store(&self) -> Result<LocalStore, CliError> {
        Ok(LocalStore::open(&self.db_path)?)
    }

    pub fn load_config(&self) -> Result<ClinicConfig, CliError> {
        Ok(ClinicConfig::load_from_path(&self.config_path)?)
    }

    /// Sync settings from the config file overlaid with the environment
    pub fn sync_config(&self) -> Result<SyncConfig, CliError> {
        Ok(self
            .load_config()?
            .sync_config(env::var(API_URL_ENV).ok(), env::var(API_TOKEN_ENV).ok())?)
    }

    pub fn open_engine(&self) -> Result<SyncEngine<HttpRemoteStore>, CliError> {
        let config = self.sync_config()?;
        if !config.is_configured() {
            return Err(CliError::SyncNotConfigured);
        }

        let remote = HttpRemoteStore::from_config(&config).map_err(clinic_core::Error::from)?;
        tracing::debug!("Sync enabled against {}", remote.base_url());
        Ok(SyncEngine::new(self.open_store()?, remote).with_request_timeout(config.request_timeout))
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("CLINIC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clinic")
        .join("clinic.db")
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clinic")
        .join("config.json")
}

pub fn parse_id(raw: &str) -> Result<RecordId, CliError> {
    Ok(raw.parse::<RecordId>()?)
}

pub fn parse_day(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(raw.to_string()))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn short_id(id: &RecordId) -> String {
    id.as_str().chars().take(13).collect()
}

pub fn format_patient_lines(patients: &[Patient]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    patients
        .iter()
        .map(|patient| {
            let age = patient
                .age
                .map_or_else(|| "-".to_string(), |age| age.to_string());
            let phone = patient.phone.as_deref().unwrap_or("-");
            let relative_time = format_relative_time(patient.updated_at, now_ms);
            format!(
                "{:<13}  {:<24}  {age:>3}  {phone:<14}  {relative_time}",
                short_id(&patient.id),
                patient.name
            )
        })
        .collect()
}

pub fn format_queue_lines(items: &[QueueItem], names: &dyn Fn(&RecordId) -> String) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            format!(
                "#{:<3}  {:<11}  {:<24}  {}",
                item.token_number,
                item.status,
                names(&item.patient_id),
                item.id
            )
        })
        .collect()
}

pub fn format_transaction_lines(entries: &[Transaction]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let sign = match entry.kind {
                clinic_core::models::TransactionKind::Credit => '+',
                clinic_core::models::TransactionKind::Debit => '-',
            };
            format!(
                "{}  {sign}{:<6}  {}",
                format_sync_timestamp(entry.created_at),
                entry.amount,
                entry.description
            )
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SyncConflictItem {
    pub id: i64,
    pub entity: String,
    pub record_id: String,
    pub local_updated_at: i64,
    pub incoming_updated_at: i64,
    pub resolved_at: i64,
    pub resolved_at_iso: String,
    pub strategy: String,
}

pub fn sync_conflict_to_item(conflict: &SyncConflict) -> SyncConflictItem {
    SyncConflictItem {
        id: conflict.id,
        entity: conflict.entity.clone(),
        record_id: conflict.record_id.clone(),
        local_updated_at: conflict.local_updated_at,
        incoming_updated_at: conflict.incoming_updated_at,
        resolved_at: conflict.resolved_at,
        resolved_at_iso: format_sync_timestamp(conflict.resolved_at),
        strategy: conflict.strategy.clone(),
    }
}

pub fn format_sync_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            format!(
                "{}  {}  {}={}  local={} incoming={}",
                format_sync_timestamp(conflict.resolved_at),
                conflict.strategy,
                conflict.entity,
                conflict.record_id,
                conflict.local_updated_at,
                conflict.incoming_updated_at
            )
        })
        .collect()
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}

/// Display name of a patient, falling back to the short id
pub fn patient_label(store: &LocalStore, id: &RecordId) -> String {
    store
        .get::<Patient>(id)
        .ok()
        .flatten()
        .map_or_else(|| short_id(id), |patient| patient.name)
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

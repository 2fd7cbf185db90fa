//! Device configuration.
//!
//! [`ClinicConfig`] is the persisted JSON file a device is provisioned
//! with. [`SyncConfig`] is the resolved runtime view the sync engine and
//! the HTTP client consume. Credentials are never written to the file;
//! the API token only ever comes from the environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_PRESCRIPTION_COST: i64 = 1;

/// Remote sync settings
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// API base URL, e.g. `https://api.clinic.example`
    pub base_url: Option<String>,
    /// Bearer token for the API
    pub token: Option<String>,
    /// Bound on every network call
    pub request_timeout: Duration,
    /// Automatic sync interval; `None` syncs only on demand
    pub sync_interval: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            request_timeout: crate::sync::DEFAULT_REQUEST_TIMEOUT,
            sync_interval: Some(DEFAULT_SYNC_INTERVAL),
        }
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout", &self.request_timeout)
            .field("sync_interval", &self.sync_interval)
            .finish()
    }
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Set the automatic sync interval; a zero interval disables auto sync
    #[must_use]
    pub const fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = if interval.is_zero() {
            None
        } else {
            Some(interval)
        };
        self
    }

    /// Disable automatic sync (manual sync only)
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check if sync is configured
    pub const fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.token.is_some()
    }
}

/// Persisted device configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClinicConfig {
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Credits charged per issued prescription
    #[serde(default)]
    pub prescription_cost: Option<i64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Seconds between automatic syncs; 0 disables them
    #[serde(default)]
    pub sync_interval_secs: Option<u64>,
}

impl ClinicConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = serde_json::from_str::<Self>(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "failed to parse config at {}: {error}",
                path.display()
            ))
        })?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let mut normalized = self.clone();
        normalized.normalize();
        normalized.validate()?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(&normalized)?)?;
        Ok(())
    }

    pub fn prescription_cost(&self) -> i64 {
        self.prescription_cost.unwrap_or(DEFAULT_PRESCRIPTION_COST)
    }

    /// Resolve runtime sync settings.
    ///
    /// `env_base_url` overrides the configured URL; `env_token` is the only
    /// source of the API token.
    pub fn sync_config(
        &self,
        env_base_url: Option<String>,
        env_token: Option<String>,
    ) -> Result<SyncConfig> {
        let base_url = normalize_text_option(env_base_url)
            .or_else(|| self.api_base_url.clone())
            .map(|url| normalize_http_url(url, "api_base_url"))
            .transpose()?;

        let mut config = SyncConfig {
            base_url,
            token: normalize_text_option(env_token),
            ..SyncConfig::default()
        };
        if let Some(secs) = self.request_timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        match self.sync_interval_secs {
            Some(0) => config = config.without_auto_sync(),
            Some(secs) => config = config.with_sync_interval(Duration::from_secs(secs)),
            None => {}
        }
        Ok(config)
    }

    fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            normalize_http_url(url.clone(), "api_base_url")?;
        }
        if let Some(cost) = self.prescription_cost {
            if cost < 0 {
                return Err(Error::InvalidInput(format!(
                    "config field 'prescription_cost' cannot be negative ({cost})"
                )));
            }
        }
        if self.request_timeout_secs == Some(0) {
            return Err(Error::InvalidInput(
                "config field 'request_timeout_secs' must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn normalize_http_url(raw: String, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("config field '{field}' is required")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(format!(
            "config field '{field}' must include http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sync_config_builders() {
        let config = SyncConfig::new("https://api.clinic.example", "token");
        assert!(config.is_configured());
        assert_eq!(config.sync_interval, Some(DEFAULT_SYNC_INTERVAL));
        assert_eq!(config.request_timeout, Duration::from_secs(10));

        let config = config
            .with_sync_interval(Duration::from_secs(5))
            .with_request_timeout(Duration::from_secs(3));
        assert_eq!(config.sync_interval, Some(Duration::from_secs(5)));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.clone().without_auto_sync().sync_interval, None);
        assert_eq!(config.with_sync_interval(Duration::ZERO).sync_interval, None);

        assert!(!SyncConfig::default().is_configured());
    }

    #[test]
    fn sync_config_debug_redacts_token() {
        let debug = format!("{:?}", SyncConfig::new("https://api.clinic.example", "s3cret"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn config_roundtrip_normalizes_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = ClinicConfig {
            api_base_url: Some(" https://api.clinic.example/ ".to_string()),
            prescription_cost: Some(2),
            request_timeout_secs: None,
            sync_interval_secs: Some(30),
        };
        config.save_to_path(&path).unwrap();

        let loaded = ClinicConfig::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.api_base_url.as_deref(),
            Some("https://api.clinic.example")
        );
        assert_eq!(loaded.prescription_cost(), 2);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClinicConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ClinicConfig::default());
        assert_eq!(config.prescription_cost(), DEFAULT_PRESCRIPTION_COST);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "api_base_url": null, "unexpected": true }"#).unwrap();

        let error = ClinicConfig::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = ClinicConfig {
            api_base_url: Some("api.clinic.example".to_string()),
            ..ClinicConfig::default()
        };
        assert!(config.save_to_path(&path).is_err());

        let config = ClinicConfig {
            prescription_cost: Some(-1),
            ..ClinicConfig::default()
        };
        assert!(config.save_to_path(&path).is_err());
    }

    #[test]
    fn environment_overrides_file_url() {
        let config = ClinicConfig {
            api_base_url: Some("https://file.clinic.example".to_string()),
            sync_interval_secs: Some(0),
            request_timeout_secs: Some(4),
            ..ClinicConfig::default()
        };

        let resolved = config
            .sync_config(
                Some("https://env.clinic.example/".to_string()),
                Some(" token ".to_string()),
            )
            .unwrap();
        assert_eq!(resolved.base_url.as_deref(), Some("https://env.clinic.example"));
        assert_eq!(resolved.token.as_deref(), Some("token"));
        assert_eq!(resolved.sync_interval, None);
        assert_eq!(resolved.request_timeout, Duration::from_secs(4));

        let without_token = config.sync_config(None, None).unwrap();
        assert_eq!(
            without_token.base_url.as_deref(),
            Some("https://file.clinic.example")
        );
        assert!(!without_token.is_configured());
    }
}

//! Runtime configuration for the sync subsystem.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Endpoints and directories the subsystem needs at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldworkConfig {
    /// Base URL of the sync/read API.
    pub api_base_url: Option<String>,
    /// Health endpoint for the connectivity probe; defaults to
    /// `<api_base_url>/healthz` when unset.
    pub probe_url: Option<String>,
    /// Directory holding the local database and durability marker.
    pub data_dir: Option<PathBuf>,
    /// Directory holding the offline reference-data cache.
    pub cache_dir: Option<PathBuf>,
    /// Local storage ceiling in bytes, when the deployment sets one.
    pub quota_bytes: Option<u64>,
    /// Connectivity poll cadence; defaults to 30 seconds.
    pub poll_interval: Option<Duration>,
}

impl FieldworkConfig {
    /// Load configuration from `FIELDKIT_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            api_base_url: env_string("FIELDKIT_API_URL"),
            probe_url: env_string("FIELDKIT_PROBE_URL"),
            data_dir: env_string("FIELDKIT_DATA_DIR").map(PathBuf::from),
            cache_dir: env_string("FIELDKIT_CACHE_DIR").map(PathBuf::from),
            quota_bytes: env_string("FIELDKIT_QUOTA_BYTES").and_then(|raw| raw.parse().ok()),
            poll_interval: env_string("FIELDKIT_POLL_INTERVAL_SECS")
                .and_then(|raw| raw.parse().ok())
                .map(Duration::from_secs),
        }
    }

    /// The validated API base URL, required for any remote operation.
    pub fn require_api_base_url(&self) -> Result<String> {
        let url = normalize_text_option(self.api_base_url.clone()).ok_or_else(|| {
            Error::InvalidInput(
                "API base URL is not configured (set FIELDKIT_API_URL)".to_string(),
            )
        })?;
        if !is_http_url(&url) {
            return Err(Error::InvalidInput(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
        Ok(url.trim_end_matches('/').to_string())
    }

    /// The connectivity probe URL, derived from the API base when unset.
    pub fn resolve_probe_url(&self) -> Result<String> {
        if let Some(url) = normalize_text_option(self.probe_url.clone()) {
            if !is_http_url(&url) {
                return Err(Error::InvalidInput(
                    "Probe URL must include http:// or https://".to_string(),
                ));
            }
            return Ok(url);
        }

        Ok(format!("{}/healthz", self.require_api_base_url()?))
    }
}

fn env_string(key: &str) -> Option<String> {
    normalize_text_option(std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_api_base_url_validates_scheme() {
        let mut config = FieldworkConfig::default();
        assert!(config.require_api_base_url().is_err());

        config.api_base_url = Some("api.example.com".to_string());
        assert!(config.require_api_base_url().is_err());

        config.api_base_url = Some(" https://api.example.com/ ".to_string());
        assert_eq!(
            config.require_api_base_url().unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn probe_url_falls_back_to_api_healthz() {
        let config = FieldworkConfig {
            api_base_url: Some("https://api.example.com".to_string()),
            ..FieldworkConfig::default()
        };
        assert_eq!(
            config.resolve_probe_url().unwrap(),
            "https://api.example.com/healthz"
        );

        let explicit = FieldworkConfig {
            probe_url: Some("https://status.example.com/ping".to_string()),
            ..FieldworkConfig::default()
        };
        assert_eq!(
            explicit.resolve_probe_url().unwrap(),
            "https://status.example.com/ping"
        );
    }
}

//! Tap configuration.
//!
//! The configuration is a JSON document with three required keys
//! (`client_id`, `client_secret`, `start_date`) and a handful of optional
//! tuning knobs. Loading fails fast with a message naming every missing key.

use std::path::Path;

use chrono::{DateTime, NaiveDate};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::auth::RefreshCadence;
use crate::{TapError, TapResult};

/// Keys that must be present in every configuration document.
pub const REQUIRED_CONFIG_KEYS: [&str; 3] = ["client_id", "client_secret", "start_date"];

/// Default Personio API root.
pub const DEFAULT_BASE_URL: &str = "https://api.personio.de/v1";

/// Configuration for one tap run.
#[derive(Debug, Deserialize)]
pub struct TapConfig {
    /// API client id.
    pub client_id: String,

    /// API client secret.
    pub client_secret: SecretString,

    /// First day of the extraction window.
    #[serde(deserialize_with = "deserialize_start_date")]
    pub start_date: NaiveDate,

    /// API root, `{base_url}/auth` and `{base_url}/company/..` are derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page size sent as `limit`.
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// How often a new bearer token is requested.
    #[serde(default)]
    pub token_refresh: RefreshCadence,

    /// Whether records arrive sorted ascending on their replication key.
    #[serde(default = "default_assume_sorted")]
    pub assume_sorted: bool,

    /// Per-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_page_limit() -> u32 {
    200
}

fn default_assume_sorted() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn deserialize_start_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_start_date(&raw).map_err(serde::de::Error::custom)
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
pub fn parse_start_date(raw: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| format!("invalid start_date '{raw}', expected YYYY-MM-DD or RFC 3339"))
}

impl TapConfig {
    /// Creates a config with required fields and defaults for the rest.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            start_date,
            base_url: default_base_url(),
            page_limit: default_page_limit(),
            token_refresh: RefreshCadence::default(),
            assume_sorted: default_assume_sorted(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Loads and validates a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> TapResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TapError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let value: Value = serde_json::from_str(&raw)
            .map_err(|e| TapError::Config(format!("config {} is not JSON: {e}", path.display())))?;
        Self::from_value(value)
    }

    /// Builds and validates a config from an already parsed JSON document.
    pub fn from_value(value: Value) -> TapResult<Self> {
        let missing: Vec<&str> = REQUIRED_CONFIG_KEYS
            .iter()
            .copied()
            .filter(|key| value.get(key).map_or(true, Value::is_null))
            .collect();
        if !missing.is_empty() {
            return Err(TapError::Config(format!(
                "Config is missing required keys: {missing:?}"
            )));
        }

        let config: Self =
            serde_json::from_value(value).map_err(|e| TapError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the page size.
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Set the token refresh cadence.
    pub fn with_token_refresh(mut self, cadence: RefreshCadence) -> Self {
        self.token_refresh = cadence;
        self
    }

    /// Declare whether replication keys arrive sorted.
    pub fn with_assume_sorted(mut self, sorted: bool) -> Self {
        self.assume_sorted = sorted;
        self
    }

    /// Checks field values that serde cannot.
    pub fn validate(&self) -> TapResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(TapError::Config("client_id must not be empty".into()));
        }
        if self.page_limit == 0 {
            return Err(TapError::Config("page_limit must be greater than zero".into()));
        }
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| TapError::Config(format!("invalid base_url: {e}")))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(TapError::Config(format!(
                "unsupported base_url scheme: {}",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Build the full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

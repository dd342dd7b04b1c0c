//! Snapshot configuration: defaults, optional TOML file, environment overrides.
//!
//! Credentials are never read implicitly by library code. The binary builds
//! a [`SyncConfig`] once at startup and hands it to the pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tickersnap_core::data::DEFAULT_BASE_URL;
use tickersnap_core::domain::MAX_PAGE_LIMIT;
use tickersnap_core::sink::csv_file::DEFAULT_CSV_PATH;
use tickersnap_core::{CaptureDatePolicy, TickerQuery, WarehouseConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Listing endpoint access.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Pause between consecutive page requests.
    pub page_delay_secs: f64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
            // Free tier allows five requests per minute.
            page_delay_secs: 12.0,
        }
    }
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("page_delay_secs", &self.page_delay_secs)
            .finish()
    }
}

impl ApiSettings {
    /// Rejects negative, non-finite, and out-of-range values.
    pub fn page_delay(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.page_delay_secs).map_err(|e| ConfigError::Invalid {
            key: "api.page_delay_secs",
            reason: format!("{e}, got {}", self.page_delay_secs),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeSettings {
    pub capture_date: CaptureDatePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Csv,
    Warehouse,
}

impl SinkKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" | "file" => Some(Self::Csv),
            "warehouse" => Some(Self::Warehouse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub path: PathBuf,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub kind: SinkKind,
    pub csv: CsvSettings,
    pub warehouse: WarehouseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub interval_secs: u64,
    /// Run once at startup instead of waiting a full interval.
    pub run_immediately: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            run_immediately: false,
        }
    }
}

impl ScheduleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Everything a snapshot run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub api: ApiSettings,
    pub query: TickerQuery,
    pub normalize: NormalizeSettings,
    pub sink: SinkSettings,
    pub schedule: ScheduleSettings,
}

impl SyncConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string. Missing keys take defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Defaults, then the optional file, then `.env` and process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        if dotenvy::dotenv().is_ok() {
            tracing::debug!("loaded .env file");
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay settings from an environment lookup. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("POLYGON_API_KEY") {
            self.api.api_key = Some(v);
        }
        if let Some(v) = get("POLYGON_BASE_URL") {
            self.api.base_url = v;
        }
        if let Some(v) = get("TICKERSNAP_SINK") {
            self.sink.kind = SinkKind::parse(&v).ok_or_else(|| ConfigError::Invalid {
                key: "TICKERSNAP_SINK",
                reason: format!("expected 'csv' or 'warehouse', got '{v}'"),
            })?;
        }
        if let Some(v) = get("TICKERSNAP_CSV_PATH") {
            self.sink.csv.path = PathBuf::from(v);
        }

        let wh = &mut self.sink.warehouse;
        if let Some(v) = get("WAREHOUSE_URL") {
            wh.url = Some(v);
        }
        if let Some(v) = get("WAREHOUSE_USER") {
            wh.user = Some(v);
        }
        if let Some(v) = get("WAREHOUSE_PASSWORD") {
            wh.password = Some(v);
        }
        if let Some(v) = get("WAREHOUSE_ACCOUNT") {
            wh.account = Some(v);
        }
        if let Some(v) = get("WAREHOUSE_NAME") {
            wh.warehouse = Some(v);
        }
        if let Some(v) = get("WAREHOUSE_DATABASE") {
            wh.database = v;
        }
        if let Some(v) = get("WAREHOUSE_SCHEMA") {
            wh.schema = v;
        }
        if let Some(v) = get("WAREHOUSE_TABLE") {
            wh.table = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ConfigError::Missing("POLYGON_API_KEY"));
        }
        self.api.page_delay()?;
        if self.query.limit == 0 || self.query.limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Invalid {
                key: "query.limit",
                reason: format!("must be between 1 and {MAX_PAGE_LIMIT}, got {}", self.query.limit),
            });
        }
        if self.schedule.interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "schedule.interval_secs",
                reason: "must be at least 1".into(),
            });
        }
        if self.sink.kind == SinkKind::Warehouse {
            self.sink
                .warehouse
                .validate()
                .map_err(|e| ConfigError::Invalid {
                    key: "sink.warehouse",
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// API key after validation.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing("POLYGON_API_KEY"))
    }

    /// Serialize to TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mut shown = self.clone();
        if shown.api.api_key.is_some() {
            shown.api.api_key = Some("[REDACTED]".into());
        }
        if shown.sink.warehouse.password.is_some() {
            shown.sink.warehouse.password = Some("[REDACTED]".into());
        }
        toml::to_string_pretty(&shown).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

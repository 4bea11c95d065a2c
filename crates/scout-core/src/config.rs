use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{TenantConfig, DEFAULT_FOUND_MESSAGE, DEFAULT_RESPAWN_MESSAGE};

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV: &str = "SCOUT_CONFIG";

/// Top-level configuration loaded from `~/.boss-scout/config.toml`.
///
/// Platform credentials are never stored here; adapters read them from the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoutConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

impl ScoutConfig {
    /// Load from `$SCOUT_CONFIG` or `~/.boss-scout/config.toml`, falling back
    /// to defaults when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_path);
        if path.exists() {
            Self::load_from(path)
        } else {
            let cfg = ScoutConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: ScoutConfig = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.validate()?;
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconciliation.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "reconciliation.interval_secs must be greater than 0".into(),
            ));
        }
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Validation("store.path must not be empty".into()));
        }
        Ok(())
    }

    /// Store path with a leading `~/` expanded to the home directory.
    pub fn store_path(&self) -> PathBuf {
        match self.store.path.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(rest),
            None => PathBuf::from(&self.store.path),
        }
    }

    /// Config for a tenant joining for the first time.
    pub fn tenant_defaults(&self, tenant_id: &str) -> TenantConfig {
        TenantConfig {
            found_message: self.messages.found.clone(),
            respawn_message: self.messages.respawn.clone(),
            ..TenantConfig::new(tenant_id)
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".boss-scout")
    }

    fn default_path() -> PathBuf {
        Self::default_dir().join("config.toml")
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(String),
    #[error("parse: {0}")]
    Parse(String),
    #[error("validation: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    /// Seconds between reconciliation scans.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> String {
    "~/.boss-scout/scout.db".into()
}

/// Message templates handed to newly joined tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "default_found")]
    pub found: String,
    #[serde(default = "default_respawn")]
    pub respawn: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            found: default_found(),
            respawn: default_respawn(),
        }
    }
}

fn default_found() -> String {
    DEFAULT_FOUND_MESSAGE.into()
}
fn default_respawn() -> String {
    DEFAULT_RESPAWN_MESSAGE.into()
}

//! Configuration loading and typed config structures for the Stronghold server.
//!
//! The canonical configuration lives in `stronghold-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, and a loader that falls back to defaults when the file is
//! absent. Every field has a default, so a partial file is valid.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use stronghold_types::{BuildingKind, Position, ResourceAmounts};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level server configuration.
///
/// Mirrors the structure of `stronghold-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: HttpConfig,

    /// Tick and snapshot schedule periods.
    #[serde(default)]
    pub simulation: ScheduleConfig,

    /// Snapshot storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the balance catalog lives.
    #[serde(default)]
    pub balance: BalanceFileConfig,

    /// What a newly registered player starts with.
    #[serde(default)]
    pub starting_city: StartingCityConfig,

    /// Login session settings.
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// A missing file yields the defaults. Environment variables override
    /// YAML values afterwards:
    /// - `STRONGHOLD_DATA_DIR` overrides `storage.data_dir`
    /// - `STRONGHOLD_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_yml::from_str(&contents)?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides are
    /// applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override settings with environment variables when set.
    ///
    /// An unparseable `STRONGHOLD_PORT` is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STRONGHOLD_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("STRONGHOLD_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid STRONGHOLD_PORT"),
            }
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Periods of the two background schedules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Real-time milliseconds between simulation ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Seconds between periodic snapshots.
    #[serde(default = "default_snapshot_interval_secs")]
    pub snapshot_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_interval_secs: default_snapshot_interval_secs(),
        }
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding `snapshots/` and the `latest` marker.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Number of snapshot files kept after each save.
    #[serde(default = "default_retention")]
    pub retention: usize,

    /// Largest encoded snapshot accepted for writing.
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            retention: default_retention(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
        }
    }
}

/// Location of the balance catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalanceFileConfig {
    /// Path to the balance YAML file.
    #[serde(default = "default_balance_path")]
    pub path: PathBuf,
}

impl Default for BalanceFileConfig {
    fn default() -> Self {
        Self {
            path: default_balance_path(),
        }
    }
}

/// The city every new player receives.
///
/// Building kinds without an override start at the `initial_level` from
/// the balance catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StartingCityConfig {
    /// Display name of the starting city.
    #[serde(default = "default_city_name")]
    pub name: String,

    /// Map position of the starting city.
    #[serde(default = "default_city_position")]
    pub position: Position,

    /// Opening resource stocks.
    #[serde(default = "default_city_resources")]
    pub resources: ResourceAmounts,

    /// Per-kind level overrides applied on top of the catalog's
    /// `initial_level`.
    #[serde(default)]
    pub building_levels: BTreeMap<BuildingKind, u32>,
}

impl Default for StartingCityConfig {
    fn default() -> Self {
        Self {
            name: default_city_name(),
            position: default_city_position(),
            resources: default_city_resources(),
            building_levels: BTreeMap::new(),
        }
    }
}

/// Login session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Seconds a session stays valid after login.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// bcrypt work factor for stored password hashes (4..=31).
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            password_cost: default_password_cost(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per line instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8000
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_snapshot_interval_secs() -> u64 {
    60
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

const fn default_retention() -> usize {
    10
}

const fn default_max_snapshot_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_balance_path() -> PathBuf {
    PathBuf::from("config/balance.yaml")
}

fn default_city_name() -> String {
    String::from("My city")
}

const fn default_city_position() -> Position {
    Position::new(100, 100)
}

const fn default_city_resources() -> ResourceAmounts {
    ResourceAmounts {
        wood: 5000,
        stone: 5000,
        iron: 3000,
        food: 5000,
        gold: 1000,
    }
}

const fn default_session_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_password_cost() -> u32 {
    12
}

fn default_log_level() -> String {
    String::from("info")
}

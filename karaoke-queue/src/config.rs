//! Configuration management for karaoke-queue
//!
//! Bootstrap configuration only: database path, port, logging and queue
//! coordination tunables. Everything is static for the life of the process.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --database, --root-folder)
//! 2. Environment variables (KARAOKE_PORT, KARAOKE_ROOT_FOLDER)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use karaoke_common::config::{default_config_file, resolve_root_folder};
use karaoke_common::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default HTTP port for the queue service
pub const DEFAULT_PORT: u16 = 5750;

/// Environment variable consulted for the root folder
pub const ROOT_FOLDER_ENV: &str = "KARAOKE_ROOT_FOLDER";

/// Database file created under the root folder when no path is configured
pub const DEFAULT_DATABASE_FILE: &str = "karaoke.db";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; a missing file yields all defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file (default: `<root>/karaoke.db`)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub queue: QueueSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Queue coordination tunables (`[queue]` table)
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// How long an operation waits for the per-event lock before `Busy`
    pub lock_timeout_ms: u64,

    /// Total time spent retrying "database is locked" before `Busy`
    pub max_lock_wait_ms: u64,

    /// Per-event notification channel capacity
    pub broadcast_capacity: usize,

    /// Event lookups attempted when a subscriber joins a channel
    pub subscribe_attempts: u32,

    /// First backoff between join attempts; doubles each retry
    pub subscribe_backoff_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5000,
            max_lock_wait_ms: 2000,
            broadcast_capacity: 256,
            subscribe_attempts: 3,
            subscribe_backoff_ms: 100,
        }
    }
}

impl QueueSettings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn subscribe_backoff(&self) -> Duration {
        Duration::from_millis(self.subscribe_backoff_ms)
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load the bootstrap file
    ///
    /// With no explicit path the default locations are searched. A missing
    /// file is not an error: the service runs on built-in defaults.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    info!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let config = Self::from_toml_str(&raw)?;
                info!("Loaded TOML configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub root_folder: PathBuf,
    pub log_level: String,
    pub queue: QueueSettings,
}

impl Config {
    /// Merge TOML values with command-line/environment overrides
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Self {
        let root_folder = resolve_root_folder(
            overrides.root_folder.as_deref(),
            ROOT_FOLDER_ENV,
            toml_config.root_folder.as_deref(),
        );

        let database_path = overrides
            .database_path
            .or(toml_config.database_path)
            .unwrap_or_else(|| root_folder.join(DEFAULT_DATABASE_FILE));

        let port = overrides.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);

        Self {
            database_path,
            port,
            root_folder,
            log_level: toml_config.logging.level,
            queue: toml_config.queue,
        }
    }
}

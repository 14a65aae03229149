use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "webserver.toml";
const CONFIG_DIR_NAME: &str = "webserver";
const CONFIG_VERSION: u32 = 1;

pub const ENV_HOST: &str = "WEBSERVER_HOST";
pub const ENV_PORT: &str = "WEBSERVER_PORT";
pub const ENV_ROOT: &str = "WEBSERVER_ROOT";

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
            max_header_bytes: default_max_header_bytes(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeepaliveConfig {
    #[serde(default = "default_keepalive_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_missed_probes")]
    pub max_missed_probes: u32,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_keepalive_interval_ms(),
            max_missed_probes: default_max_missed_probes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentConfig {
    /// Fixed document roots, registered in this order.
    #[serde(default)]
    pub document_roots: Vec<PathBuf>,
    /// Directory for temporary upload files; the OS temp dir when unset.
    #[serde(default)]
    pub upload_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub keepalive: KeepaliveConfig,

    #[serde(default)]
    pub content: ContentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            network: NetworkConfig::default(),
            keepalive: KeepaliveConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> u32 {
    CONFIG_VERSION
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8090
}
fn default_read_timeout_ms() -> u64 {
    5_000
}
fn default_max_header_bytes() -> usize {
    8_192
}
fn default_max_body_bytes() -> u64 {
    64 * 1024 * 1024
}
fn default_keepalive_interval_ms() -> u64 {
    2_000
}
fn default_max_missed_probes() -> u32 {
    2
}

// ============================================
// IMPLEMENTATION
// ============================================

impl ServerConfig {
    /// Platform config directory for the server (`<config dir>/webserver`).
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME))
    }

    /// Load config from `{config_dir}/webserver.toml`.
    ///
    /// # Returns
    ///
    /// Returns defaults if the file is missing.
    /// Returns `Err(ConfigError)` if the file exists but is unreadable or invalid.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            info!(
                "Config file not found at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            warn!("Failed to read config file: {}", e);
            ConfigError::ReadError {
                location: ErrorLocation::from(Location::caller()),
                path: config_path.clone(),
                source: e,
            }
        })?;

        let config = Self::parse(&contents).map_err(|reason| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            reason,
        })?;

        config.validate()?;

        info!("Config loaded from {}", config_path.display());
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Apply `WEBSERVER_*` overrides read through `lookup`.
    ///
    /// `lookup` is normally `|name| std::env::var(name).ok()`; taking it as a
    /// parameter keeps the process environment out of tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            info!("Using {ENV_HOST} override: {host}");
            self.network.host = host;
        }

        if let Some(port) = lookup(ENV_PORT) {
            self.network.port =
                port.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::OverrideError {
                        location: ErrorLocation::from(Location::caller()),
                        variable: ENV_PORT.to_string(),
                        reason: format!("{port:?}: {e}"),
                    })?;
            info!("Using {ENV_PORT} override: {}", self.network.port);
        }

        if let Some(root) = lookup(ENV_ROOT) {
            let root = PathBuf::from(root);
            if !self.content.document_roots.contains(&root) {
                info!("Using {ENV_ROOT} override: {}", root.display());
                self.content.document_roots.push(root);
            }
        }

        self.validate()
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 || self.version > CONFIG_VERSION {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "Invalid version: {} (expected 1-{})",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        if self.network.host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "network.host cannot be empty".to_string(),
            });
        }

        if self.network.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "network.read_timeout_ms must be positive".to_string(),
            });
        }

        if self.network.max_header_bytes < 256 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "network.max_header_bytes too small: {} (minimum 256)",
                    self.network.max_header_bytes
                ),
            });
        }

        if self.keepalive.interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "keepalive.interval_ms must be positive".to_string(),
            });
        }

        if self.keepalive.max_missed_probes == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "keepalive.max_missed_probes must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// `host:port` string handed to the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.network.read_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive.interval_ms)
    }
}
